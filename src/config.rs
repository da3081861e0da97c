//! Configuration types for a tail run
//!
//! This module contains all the configuration structures loaded from the
//! YAML config file. See [`crate::loader`] for parsing and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default cursor table name, shared with existing `path_since` cursor
/// databases so their table → position mappings are picked up unchanged.
pub const DEFAULT_CURSOR_TABLE: &str = "path_since";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete tail configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailConfig {
    /// Source database settings
    pub source: SourceConfig,

    /// Where per-table cursors are kept
    pub cursor_store: CursorStoreConfig,

    /// Poll loop tuning
    #[serde(default)]
    pub polling: PollConfig,

    /// Event envelope metadata
    #[serde(default)]
    pub event: EnvelopeConfig,
}

// ============================================================================
// Source
// ============================================================================

/// Source database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Monotonically increasing identifier column
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Restrict polling to these tables (discovery order otherwise)
    #[serde(default)]
    pub tables: Option<Vec<String>>,

    /// Tables never polled
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Per-table projection queries.
    ///
    /// Each query takes `?1` (last seen id) and `?2` (batch size) and must
    /// return the identifier column under the name `id_column`.
    #[serde(default)]
    pub queries: HashMap<String, String>,

    /// Busy timeout applied to the source connection (milliseconds)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    1000
}

impl SourceConfig {
    /// Create a source config for a database file with defaults
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: default_id_column(),
            tables: None,
            exclude_tables: Vec::new(),
            queries: HashMap::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// Set the identifier column
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Restrict to an explicit table list
    #[must_use]
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Exclude a table by name
    #[must_use]
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }

    /// Use a custom projection query for a table
    #[must_use]
    pub fn with_query(mut self, table: impl Into<String>, query: impl Into<String>) -> Self {
        self.queries.insert(table.into(), query.into());
        self
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

// ============================================================================
// Cursor Store
// ============================================================================

/// Cursor store backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CursorStoreConfig {
    /// SQLite table `{table, place}`
    Sqlite {
        /// Database file holding the cursor table
        path: PathBuf,
        /// Cursor table name
        #[serde(default = "default_cursor_table")]
        table: String,
    },
    /// DuckDB table `{table, place}`
    Duckdb {
        /// Database file holding the cursor table
        path: PathBuf,
        /// Cursor table name
        #[serde(default = "default_cursor_table")]
        table: String,
    },
    /// JSON document mapping table → position
    Json {
        /// JSON file path
        path: PathBuf,
    },
    /// Process-local, lost on exit
    Memory,
}

fn default_cursor_table() -> String {
    DEFAULT_CURSOR_TABLE.to_string()
}

impl CursorStoreConfig {
    /// SQLite cursor store with the default table name
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            table: default_cursor_table(),
        }
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Sqlite { path, .. } | Self::Duckdb { path, .. } | Self::Json { path } => {
                Some(path)
            }
            Self::Memory => None,
        }
    }

    /// Name of the cursor table for table-backed stores
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Sqlite { table, .. } | Self::Duckdb { table, .. } => Some(table),
            Self::Json { .. } | Self::Memory => None,
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    /// Rows fetched per table per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Idle sleep floor (milliseconds)
    #[serde(default = "default_sleep_min_ms")]
    pub sleep_min_ms: u64,

    /// Idle sleep cap (milliseconds)
    #[serde(default = "default_sleep_max_ms")]
    pub sleep_max_ms: u64,
}

fn default_batch_size() -> usize {
    5
}

fn default_sleep_min_ms() -> u64 {
    10
}

fn default_sleep_max_ms() -> u64 {
    5000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sleep_min_ms: default_sleep_min_ms(),
            sleep_max_ms: default_sleep_max_ms(),
        }
    }
}

impl PollConfig {
    /// Create a poll config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the idle sleep bounds
    #[must_use]
    pub fn with_sleep(mut self, min: Duration, max: Duration) -> Self {
        self.sleep_min_ms = min.as_millis() as u64;
        self.sleep_max_ms = max.as_millis() as u64;
        self
    }

    /// Idle sleep floor
    pub fn sleep_min(&self) -> Duration {
        Duration::from_millis(self.sleep_min_ms)
    }

    /// Idle sleep cap
    pub fn sleep_max(&self) -> Duration {
        Duration::from_millis(self.sleep_max_ms)
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// Metadata stamped on every emitted event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Host name override (system host name otherwise)
    #[serde(default)]
    pub host: Option<String>,

    /// Source label (database path otherwise)
    #[serde(default)]
    pub source_label: Option<String>,

    /// Logical base name the database belongs to
    #[serde(default)]
    pub base_name: Option<String>,
}
