//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Transaction ingestion API with asynchronous fraud flagging.
#[derive(Parser, Debug)]
#[command(name = "txwatch", version, about)]
pub struct Cli {
    /// Path to a TOML config file. Defaults to config/txwatch.toml when present.
    #[arg(long, env = "TXWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server and the detection worker (default).
    Serve,
    /// Create the database schema and exit.
    Migrate,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}
