//! Cursor store module
//!
//! Durable mapping from table name to the last forwarded row identifier.
//! A restart reads these positions back so polling resumes where it stopped.
//!
//! # Overview
//!
//! The store module provides:
//! - `CursorStore` - the storage contract used by the poller
//! - `SqliteCursorStore` - `{table, place}` table in a SQLite file
//! - `DuckDbCursorStore` - the same table in a DuckDB file
//! - `JsonFileCursorStore` - JSON document with atomic rewrites
//! - `MemoryCursorStore` - process-local store for tests and dry runs
//!
//! Stores assume a single writer. Nothing guards against a second process
//! updating the same cursor records.

mod duckdb_store;
mod file;
mod memory;
mod sqlite_store;

pub use duckdb_store::DuckDbCursorStore;
pub use file::JsonFileCursorStore;
pub use memory::MemoryCursorStore;
pub use sqlite_store::SqliteCursorStore;

use crate::config::CursorStoreConfig;
use crate::error::Result;
use crate::types::{Cursor, RowId};
use async_trait::async_trait;

/// Result of preparing the cursor storage structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Storage was created by this call
    Created,
    /// Storage was already present; nothing changed
    AlreadyExists,
}

/// Durable per-table cursor storage
///
/// Any I/O failure is reported as [`crate::Error::Storage`] and is fatal to
/// the poll loop. Implementations do not retry.
#[async_trait]
pub trait CursorStore: Send {
    /// Create the storage structure if absent. Safe to call repeatedly.
    async fn ensure_initialized(&mut self) -> Result<InitOutcome>;

    /// Attach to existing storage without creating anything. Returns false
    /// when the storage structure does not exist yet.
    async fn load_existing(&mut self) -> Result<bool>;

    /// Stored position for `table`; creates a record at 0 when none exists
    async fn get(&mut self, table: &str) -> Result<RowId>;

    /// Overwrite the stored position for `table` in a single write
    async fn set(&mut self, table: &str, position: RowId) -> Result<()>;

    /// All stored cursors, ordered by table name
    async fn list(&mut self) -> Result<Vec<Cursor>>;

    /// Human-readable location, for logging
    fn describe(&self) -> String;
}

/// Open the cursor store described by `config`
pub fn open_store(config: &CursorStoreConfig) -> Result<Box<dyn CursorStore>> {
    let store: Box<dyn CursorStore> = match config {
        CursorStoreConfig::Sqlite { path, table } => {
            Box::new(SqliteCursorStore::open(path, table.clone())?)
        }
        CursorStoreConfig::Duckdb { path, table } => {
            Box::new(DuckDbCursorStore::open(path, table.clone())?)
        }
        CursorStoreConfig::Json { path } => Box::new(JsonFileCursorStore::new(path)),
        CursorStoreConfig::Memory => Box::new(MemoryCursorStore::new()),
    };
    Ok(store)
}
