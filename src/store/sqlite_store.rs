//! SQLite-backed cursor store
//!
//! Cursors live in a two-column table `{"table" TEXT, place INTEGER}`, one
//! row per tracked table.

use super::{CursorStore, InitOutcome};
use crate::error::{Error, Result};
use crate::sql::quote_ident;
use crate::types::{Cursor, RowId};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Cursor store in a SQLite database file
pub struct SqliteCursorStore {
    conn: Connection,
    path: PathBuf,
    table: String,
}

impl SqliteCursorStore {
    /// Open (or create) the cursor database at `path`
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| {
            Error::storage(format!(
                "Failed to open cursor database '{}': {e}",
                path.display()
            ))
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Ok(Self {
            conn,
            path,
            table: table.into(),
        })
    }

    /// Cursor store in a private in-memory database
    pub fn in_memory(table: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            table: table.into(),
        })
    }

    /// Name of the cursor table
    pub fn table(&self) -> &str {
        &self.table
    }

    fn table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![self.table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[async_trait]
impl CursorStore for SqliteCursorStore {
    async fn ensure_initialized(&mut self) -> Result<InitOutcome> {
        if self.table_exists()? {
            info!(table = %self.table, "cursor table already exists");
            return Ok(InitOutcome::AlreadyExists);
        }

        info!(table = %self.table, "creating cursor table");
        let create = format!(
            "CREATE TABLE {} (\"table\" TEXT, place INTEGER)",
            quote_ident(&self.table)
        );
        match self.conn.execute_batch(&create) {
            Ok(()) => Ok(InitOutcome::Created),
            // Lost a race with another initializer
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
        let select = format!(
            "SELECT place FROM {} WHERE \"table\" = ?1 LIMIT 1",
            quote_ident(&self.table)
        );
        let place: Option<Option<RowId>> = self
            .conn
            .query_row(&select, params![table], |row| row.get(0))
            .optional()?;

        if let Some(place) = place {
            let position = place.unwrap_or(0);
            info!(table, position, "cursor already exists");
            return Ok(position);
        }

        info!(table, "initializing cursor at 0");
        let insert = format!(
            "INSERT INTO {} (\"table\", place) VALUES (?1, 0)",
            quote_ident(&self.table)
        );
        self.conn.execute(&insert, params![table])?;
        Ok(0)
    }

    async fn set(&mut self, table: &str, position: RowId) -> Result<()> {
        debug!(table, position, "storing cursor");
        let quoted = quote_ident(&self.table);

        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            &format!("UPDATE {quoted} SET place = ?2 WHERE \"table\" = ?1"),
            params![table, position],
        )?;
        if updated == 0 {
            tx.execute(
                &format!("INSERT INTO {quoted} (\"table\", place) VALUES (?1, ?2)"),
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
        format!("sqlite:{}#{}", self.path.display(), self.table)
    }
}

impl std::fmt::Debug for SqliteCursorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCursorStore")
            .field("path", &self.path)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
