use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Weekly task planner for the terminal.
/// Storage defaults to ~/.weekplan or a directory passed via --dir.
#[derive(Parser)]
#[command(name = "wkp", version, about = "Weekly task planner CLI")]
pub struct Cli {
    /// Path to the storage directory.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
