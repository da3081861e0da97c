//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tail new rows out of SQLite tables
#[derive(Parser, Debug)]
#[command(name = "rowtail")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tail configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll tables and print events until interrupted
    Run {
        /// Exit once every table is caught up instead of waiting for new rows
        #[arg(long)]
        once: bool,

        /// Events buffered between the poller and stdout
        #[arg(long, default_value = "1024")]
        buffer: usize,
    },

    /// List tracked tables and their stored cursors
    Tables,

    /// Print every stored cursor
    Cursors,

    /// Validate the configuration file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Human-readable output
    Pretty,
}
