// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # rowtail
//!
//! Incremental row tailing for SQLite databases.
//!
//! Every tracked table has a cursor: the identifier of the last row handed
//! downstream. Each poll fetches the rows above the cursor in identifier
//! order, forwards them as events and persists the new cursor, so a restart
//! resumes where the previous run left off.
//!
//! ## Features
//!
//! - **Table discovery**: every user table, or an explicit list
//! - **Durable cursors**: SQLite, DuckDB or JSON file storage
//! - **Idle backoff**: doubling sleep between empty cycles, reset on activity
//! - **Custom projections**: per-table queries with joins and aliases
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowtail::{load_config, ChannelSink, PollScheduler, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("tail.yaml")?;
//!     let (sink, mut events) = ChannelSink::channel(1024);
//!
//!     let mut scheduler = PollScheduler::from_config(&config, Box::new(sink))?;
//!     tokio::spawn(async move { scheduler.run().await });
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      PollScheduler                        │
//! │   initialize() → run_cycle() → idle backoff → reopen()    │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                        TablePoller
//!                              │
//! ┌───────────────┬────────────┴───────────┬──────────────────┐
//! │   RowSource   │       CursorStore      │    EventSink     │
//! ├───────────────┼────────────────────────┼──────────────────┤
//! │ SQLite        │ SQLite (path_since)    │ Channel          │
//! │ Memory        │ DuckDB / JSON / Memory │ JSON lines       │
//! └───────────────┴────────────────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration structures
pub mod config;

/// YAML loader for tail configurations
pub mod loader;

/// Identifier quoting
pub mod sql;

/// Durable cursor storage
pub mod store;

/// Row sources
pub mod source;

/// Events and sinks
pub mod sink;

/// Polling engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{CursorStoreConfig, PollConfig, SourceConfig, TailConfig};
pub use engine::{PollScheduler, SchedulerState, TablePoller};
pub use loader::{load_config, load_config_from_str};
pub use sink::{ChannelSink, Event, EventSink};
pub use source::{FetchResult, RowSource};
pub use store::{open_store, CursorStore, InitOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
