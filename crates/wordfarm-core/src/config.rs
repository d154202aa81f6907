use crate::{
    constant::{CONFIG_DIR, CONFIG_ENV, CONFIG_FILE},
    scroll::SCROLL_TOLERANCE,
    WallError, WallResult,
};
use home::home_dir;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Milliseconds between two revealed characters.
    pub unit_delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self { unit_delay_ms: 50 }
    }
}

impl RevealConfig {
    pub fn unit_delay(&self) -> Duration {
        Duration::from_millis(self.unit_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// How far from the bottom still counts as being at the bottom.
    pub tolerance: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            tolerance: SCROLL_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Start every submission as a new post instead of extending the tail.
    pub newline_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    pub reveal: RevealConfig,
    pub scroll: ScrollConfig,
    pub compose: ComposeConfig,
}

impl WallConfig {
    /// Where the config lives when nothing says otherwise:
    /// `~/.wordfarm/wordfarm.toml`.
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the config from `explicit`, else from the path in the
    /// `WORDFARMCONF` env var, else from the default path. Only a missing
    /// default file falls back to defaults.
    pub fn load(explicit: Option<PathBuf>) -> WallResult<Self> {
        let requested = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match requested {
            Some(path) => Self::from_file(&path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &std::path::Path) -> WallResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WallError::config_error(format!("Unable to read {}: {e}", path.display()))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> WallResult<Self> {
        let config = toml::from_str::<Self>(content)
            .map_err(|e| WallError::config_error(format!("Parsing error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config in toml form to `path`.
    pub fn save(&self, path: &std::path::Path) -> WallResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> WallResult<()> {
        if !self.scroll.tolerance.is_finite() || self.scroll.tolerance < 0.0 {
            return Err(WallError::config_error(format!(
                "scroll.tolerance must be a non-negative number, got {}",
                self.scroll.tolerance
            ))
            .into());
        }
        Ok(())
    }
}
