//! Row source module
//!
//! Read access to the database being tailed.
//!
//! # Overview
//!
//! The source module provides:
//! - `RowSource` - table listing, bounded ordered fetch, reconnect
//! - `FetchResult` - rows / empty / unavailable outcome of one fetch
//! - `SqliteSource` - read-only SQLite connection
//! - `MemorySource` - in-process tables for tests and embedding

mod memory;
mod sqlite;

pub use memory::MemorySource;
pub use sqlite::SqliteSource;

use crate::error::Result;
use crate::types::{Row, RowId};
use async_trait::async_trait;

/// Outcome of a single batch fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// One or more rows, ascending by identifier
    Rows(Vec<Row>),
    /// No row past the cursor yet
    Empty,
    /// The source could not be read this time; retry next cycle
    Unavailable(String),
}

impl FetchResult {
    /// Wrap fetched rows, mapping an empty batch to [`FetchResult::Empty`]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Rows(rows)
        }
    }

    /// Number of rows carried
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Empty | Self::Unavailable(_) => 0,
        }
    }

    /// Check if no rows are carried
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the source was unavailable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Read side of the tailed database
///
/// The connection is owned by the source. [`RowSource::reopen`] releases the
/// current handle before a new one is acquired.
#[async_trait]
pub trait RowSource: Send {
    /// Tables to poll for this run: finite, duplicate-free, already filtered
    async fn list_tracked_tables(&mut self) -> Result<Vec<String>>;

    /// Up to `limit` rows of `table` with identifier strictly greater than
    /// `after_id`, ascending by identifier, with no gaps
    async fn fetch_batch(&mut self, table: &str, after_id: RowId, limit: usize) -> FetchResult;

    /// Tear down and re-establish the connection
    async fn reopen(&mut self) -> Result<()>;

    /// Human-readable location, for logging and event metadata
    fn describe(&self) -> String;
}

/// Remove duplicates and excluded names, keeping first-seen order
pub fn filter_tables<I>(tables: I, exclude: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    tables
        .into_iter()
        .filter(|t| !exclude.iter().any(|e| e == t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
