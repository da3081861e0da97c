//! DuckDB-backed cursor store
//!
//! Same `{"table", place}` layout as the SQLite store, kept in a DuckDB file.

use super::{CursorStore, InitOutcome};
use crate::error::{Error, Result};
use crate::sql::quote_ident;
use crate::types::{Cursor, RowId};
use async_trait::async_trait;
use duckdb::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cursor store in a DuckDB database file
pub struct DuckDbCursorStore {
    conn: Connection,
    path: PathBuf,
    table: String,
}

impl DuckDbCursorStore {
    /// Open (or create) the cursor database at `path`
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| {
            Error::storage(format!(
                "Failed to open DuckDB cursor database '{}': {e}",
                path.display()
            ))
        })?;

        Ok(Self {
            conn,
            path,
            table: table.into(),
        })
    }

    /// Cursor store in an in-memory DuckDB database
    pub fn in_memory(table: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            table: table.into(),
        })
    }

    fn table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            params![self.table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        let select = format!(
            "SELECT COUNT(*) FROM {} WHERE \"table\" = ?",
            quote_ident(&self.table)
        );
        Ok(self.conn.query_row(&select, params![table], |row| row.get(0))?)
    }
}

#[async_trait]
impl CursorStore for DuckDbCursorStore {
    async fn ensure_initialized(&mut self) -> Result<InitOutcome> {
        if self.table_exists()? {
            info!(table = %self.table, "cursor table already exists");
            return Ok(InitOutcome::AlreadyExists);
        }

        info!(table = %self.table, "creating cursor table");
        let create = format!(
            "CREATE TABLE {} (\"table\" VARCHAR, place BIGINT)",
            quote_ident(&self.table)
        );
        match self.conn.execute_batch(&create) {
            Ok(()) => Ok(InitOutcome::Created),
            Err(_) if self.table_exists()? => {
                info!(table = %self.table, "cursor table already exists");
                Ok(InitOutcome::AlreadyExists)
            }
            Err(e) => Err(Error::storage(format!(
                "Failed to create cursor table '{}': {e}",
                self.table
            ))),
        }
    }

    async fn load_existing(&mut self) -> Result<bool> {
        self.table_exists()
    }

    async fn get(&mut self, table: &str) -> Result<RowId> {
        if self.count_rows(table)? > 0 {
            let select = format!(
                "SELECT place FROM {} WHERE \"table\" = ? LIMIT 1",
                quote_ident(&self.table)
            );
            let place: Option<RowId> =
                self.conn.query_row(&select, params![table], |row| row.get(0))?;
            let position = place.unwrap_or(0);
            info!(table, position, "cursor already exists");
            return Ok(position);
        }

        info!(table, "initializing cursor at 0");
        let insert = format!(
            "INSERT INTO {} (\"table\", place) VALUES (?, 0)",
            quote_ident(&self.table)
        );
        self.conn.execute(&insert, params![table])?;
        Ok(0)
    }

    async fn set(&mut self, table: &str, position: RowId) -> Result<()> {
        debug!(table, position, "storing cursor");
        let quoted = quote_ident(&self.table);
        let exists = self.count_rows(table)? > 0;

        let tx = self.conn.transaction()?;
        if exists {
            tx.execute(
                &format!("UPDATE {quoted} SET place = ? WHERE \"table\" = ?"),
                params![position, table],
            )?;
        } else {
            tx.execute(
                &format!("INSERT INTO {quoted} (\"table\", place) VALUES (?, ?)"),
                params![table, position],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    async fn list(&mut self) -> Result<Vec<Cursor>> {
        let select = format!(
            "SELECT \"table\", place FROM {} ORDER BY \"table\"",
            quote_ident(&self.table)
        );
        let mut stmt = self.conn.prepare(&select)?;
        let cursors = stmt
            .query_map([], |row| {
                let table: String = row.get(0)?;
                let place: Option<RowId> = row.get(1)?;
                Ok(Cursor::new(table, place.unwrap_or(0)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cursors)
    }

    fn describe(&self) -> String {
        format!("duckdb:{}#{}", self.path.display(), self.table)
    }
}

impl std::fmt::Debug for DuckDbCursorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbCursorStore")
            .field("path", &self.path)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
