//! CLI module
//!
//! Command-line interface for tailing a database.
//!
//! # Commands
//!
//! - `run` - Poll until interrupted, printing one event per line
//! - `tables` - List tracked tables with their stored cursors
//! - `cursors` - Dump the cursor store
//! - `validate` - Check the configuration file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
