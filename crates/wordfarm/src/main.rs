mod replay;
mod typewriter;
mod wall;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use wordfarm_core::config::WallConfig;

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    /// Path to config file; defaults to ~/.wordfarm/wordfarm.toml
    config: Option<PathBuf>,

    #[arg(short, long, action = ArgAction::SetTrue)]
    /// Select if the output should be json
    json: bool,

    #[command(subcommand)]
    command: WordfarmCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum WordfarmCommand {
    /// Open an interactive wall backed by an in-memory feed
    Wall {
        /// Start in newline mode: every line becomes its own post
        #[arg(short, long, action = ArgAction::SetTrue)]
        newline: bool,
    },

    /// Feed a JSON file of snapshots through the engine and print what
    /// each one reveals
    Replay { file: PathBuf },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match WallConfig::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        WordfarmCommand::Wall { newline } => wall::run(config, newline).await,
        WordfarmCommand::Replay { file } => replay::run(&config, &file, cli.json).await,
    };
    if let Err(e) = result {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}
