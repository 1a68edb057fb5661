//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod formatters;
pub mod output;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "refshelf",
    version,
    about = "Search a bibliographic reference library: metadata, page text and similar papers",
    propagate_version = true
)]
pub struct Cli {
    /// Config file (defaults to the per-user config, see REFSHELF_CONFIG)
    #[arg(long, global = true, env = "REFSHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Library database path (overrides library.db_path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}
