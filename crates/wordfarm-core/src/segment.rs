//! Splits a line of text into literal runs and auto-detected links.

use crate::WallResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

const LINK_PATTERN: &str = r#"(?i)(?:https?://|www\.)[^\s<>"]+"#;

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Literal { text: String },
    Link { text: String, target: String },
}

impl Segment {
    pub fn literal(text: impl Into<String>) -> Self {
        Segment::Literal { text: text.into() }
    }

    /// The source text covered by the segment.
    pub fn text(&self) -> &str {
        match self {
            Segment::Literal { text } | Segment::Link { text, .. } => text,
        }
    }

    /// Width of the segment in the post's character index space.
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Segment::Link { .. })
    }
}

/// Finds URL-like spans. Build it once and reuse it for every line.
#[derive(Debug, Clone)]
pub struct LinkDetector {
    pattern: Regex,
}

impl LinkDetector {
    pub fn new() -> WallResult<Self> {
        Ok(Self {
            pattern: Regex::new(LINK_PATTERN)?,
        })
    }

    /// Split `line` into segments, left to right, links never overlapping.
    /// Concatenating the segment texts gives back `line`.
    pub fn segment(&self, line: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for found in self.pattern.find_iter(line) {
            let Some(matched) = trim_link(found.as_str()) else {
                continue;
            };
            if found.start() > cursor {
                segments.push(Segment::literal(&line[cursor..found.start()]));
            }
            segments.push(Segment::Link {
                text: matched.to_owned(),
                target: link_target(matched),
            });
            cursor = found.start() + matched.len();
        }
        if cursor < line.len() {
            segments.push(Segment::literal(&line[cursor..]));
        }
        merge_literals(segments)
    }
}

/// Drop sentence punctuation and unbalanced closing brackets from the end of
/// a match. Returns `None` when trimming ate into the scheme or nothing but
/// the scheme is left.
fn trim_link(candidate: &str) -> Option<&str> {
    let mut end = candidate.len();
    loop {
        let current = &candidate[..end];
        let Some(last) = current.chars().last() else {
            break;
        };
        let strip = if TRAILING_PUNCTUATION.contains(&last) {
            true
        } else if let Some(open) = opening_bracket(last) {
            current.matches(last).count() > current.matches(open).count()
        } else {
            false
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    let trimmed = &candidate[..end];
    match scheme_stripped(trimmed) {
        Some(host) if !host.is_empty() => Some(trimmed),
        _ => None,
    }
}

fn opening_bracket(close: char) -> Option<char> {
    match close {
        ')' => Some('('),
        ']' => Some('['),
        '}' => Some('{'),
        _ => None,
    }
}

/// What follows the scheme or `www.`, if `link` still starts with one.
fn scheme_stripped(link: &str) -> Option<&str> {
    let lower = link.to_ascii_lowercase();
    ["https://", "http://", "www."]
        .into_iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map(|prefix| &link[prefix.len()..])
}

fn link_target(matched: &str) -> String {
    if matched.to_ascii_lowercase().starts_with("www.") {
        format!("https://{matched}")
    } else {
        matched.to_owned()
    }
}

/// Adjacent literal runs are joined when a candidate match was rejected.
fn merge_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (merged.last_mut(), segment) {
            (Some(Segment::Literal { text: prev }), Segment::Literal { text }) => {
                prev.push_str(&text);
            }
            (_, segment) => merged.push(segment),
        }
    }
    merged
}
