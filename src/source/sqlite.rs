//! SQLite row source
//!
//! Holds a single read-only connection to the tailed database. Connectivity
//! failures drop the handle so that the next fetch opens a fresh one.

use super::{filter_tables, FetchResult, RowSource};
use crate::config::{CursorStoreConfig, SourceConfig, TailConfig};
use crate::error::{Error, Result};
use crate::sql::quote_ident;
use crate::types::{Row, RowId, Value};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use std::path::Path;
use tracing::{debug, info, warn};

/// Row source reading a SQLite database file
pub struct SqliteSource {
    config: SourceConfig,
    /// Names hidden from discovery in addition to `exclude_tables`
    hidden: Vec<String>,
    conn: Option<Connection>,
}

impl SqliteSource {
    /// Create a source; the connection is opened lazily
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            hidden: Vec::new(),
            conn: None,
        }
    }

    /// Create a source and open its connection immediately
    pub fn open(config: SourceConfig) -> Result<Self> {
        let mut source = Self::new(config);
        source.connect()?;
        Ok(source)
    }

    /// Build the source for a full tail configuration
    ///
    /// A SQLite cursor table stored in the tailed database itself is hidden
    /// from discovery.
    pub fn for_tail(config: &TailConfig) -> Self {
        let source = Self::new(config.source.clone());
        match &config.cursor_store {
            CursorStoreConfig::Sqlite { path, table } if same_file(path, &config.source.path) => {
                debug!(table = %table, "cursor table shares the source database");
                source.hide_table(table.clone())
            }
            _ => source,
        }
    }

    /// Hide a table from discovery (e.g. a cursor table in the same file)
    #[must_use]
    pub fn hide_table(mut self, table: impl Into<String>) -> Self {
        self.hidden.push(table.into());
        self
    }

    /// Source configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// SQL used to fetch a batch from `table`
    pub fn batch_query(&self, table: &str) -> String {
        if let Some(query) = self.config.queries.get(table) {
            return query.clone();
        }
        let id = quote_ident(&self.config.id_column);
        format!(
            "SELECT * FROM {} WHERE {id} > ?1 ORDER BY {id} ASC LIMIT ?2",
            quote_ident(table)
        )
    }

    fn open_connection(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.config.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(self.config.busy_timeout())?;
        Ok(conn)
    }

    fn connect(&mut self) -> Result<()> {
        let conn = self.open_connection().map_err(|e| {
            Error::unavailable(format!(
                "Failed to open '{}': {e}",
                self.config.path.display()
            ))
        })?;
        info!(path = %self.config.path.display(), "connected to source database");
        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "source connection did not close cleanly");
            }
        }
    }

    fn discover_tables(&mut self) -> Result<Vec<String>> {
        if self.conn.is_none() {
            self.connect()?;
        }
        let Some(conn) = self.conn.as_ref() else {
            return Err(Error::unavailable("not connected"));
        };

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY rowid",
            )
            .map_err(|e| Error::unavailable(format!("Failed to list tables: {e}")))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| Error::unavailable(format!("Failed to list tables: {e}")))?;

        Ok(names)
    }
}

#[async_trait]
impl RowSource for SqliteSource {
    async fn list_tracked_tables(&mut self) -> Result<Vec<String>> {
        info!("fetching tables");
        let candidates = match &self.config.tables {
            Some(tables) => tables.clone(),
            None => self.discover_tables()?,
        };

        let mut exclude = self.config.exclude_tables.clone();
        exclude.extend(self.hidden.iter().cloned());
        Ok(filter_tables(candidates, &exclude))
    }

    async fn fetch_batch(&mut self, table: &str, after_id: RowId, limit: usize) -> FetchResult {
        let sql = self.batch_query(table);

        if self.conn.is_none() {
            if let Err(e) = self.connect() {
                return FetchResult::Unavailable(e.to_string());
            }
        }
        let Some(conn) = self.conn.as_ref() else {
            return FetchResult::Unavailable("not connected".to_string());
        };

        match query_rows(conn, &sql, &self.config.id_column, after_id, limit) {
            Ok(rows) => {
                debug!(table, after_id, rows = rows.len(), "fetched batch");
                FetchResult::from_rows(rows)
            }
            Err(e) => {
                if is_connection_error(&e) {
                    self.disconnect();
                }
                FetchResult::Unavailable(format!("Failed to read table '{table}': {e}"))
            }
        }
    }

    async fn reopen(&mut self) -> Result<()> {
        debug!(path = %self.config.path.display(), "reopening source connection");
        self.disconnect();
        self.connect()
    }

    fn describe(&self) -> String {
        self.config.path.display().to_string()
    }
}

impl std::fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSource")
            .field("path", &self.config.path)
            .field("connected", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

/// Run a batch query and convert every column
fn query_rows(
    conn: &Connection,
    sql: &str,
    id_column: &str,
    after_id: RowId,
    limit: usize,
) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let id_index = columns
        .iter()
        .position(|c| c == id_column)
        .ok_or_else(|| rusqlite::Error::InvalidColumnName(id_column.to_string()))?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut rows = stmt.query(params![after_id, limit])?;

    let mut batch = Vec::new();
    while let Some(row) = rows.next()? {
        let id_type = row.get_ref(id_index)?.data_type();
        let mut fields = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            fields.push((name.clone(), value_from_ref(row.get_ref(i)?)));
        }
        let row = Row::from_fields(id_column, fields).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(id_index, id_column.to_string(), id_type)
        })?;
        batch.push(row);
    }

    Ok(batch)
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Errors after which the handle is discarded and reopened next cycle
fn is_connection_error(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::FileLockingProtocolFailed
        ),
        _ => false,
    }
}
