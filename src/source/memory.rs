//! In-memory row source
//!
//! Tables are plain row vectors behind a shared handle. Clones see the same
//! data, so rows can be appended while a scheduler is polling.

use super::{FetchResult, RowSource};
use crate::error::{Error, Result};
use crate::types::{Row, RowId, Value};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    /// Tables in discovery order
    tables: Vec<(String, Vec<Row>)>,
    unavailable: HashSet<String>,
    fail_reopen: bool,
    /// Remaining table listings that report unavailable
    failed_listings: usize,
    reopens: usize,
    fetches: Vec<(String, RowId, usize)>,
}

impl Inner {
    fn table_mut(&mut self, name: &str) -> &mut Vec<Row> {
        let index = match self.tables.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.tables.push((name.to_string(), Vec::new()));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index].1
    }
}

/// Row source backed by in-process tables
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    /// Create a source with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty table
    #[must_use]
    pub fn with_table(self, name: &str) -> Self {
        self.lock().table_mut(name);
        self
    }

    /// Append a row; rows are kept sorted by identifier
    pub fn insert(&self, table: &str, row: Row) {
        let mut inner = self.lock();
        let rows = inner.table_mut(table);
        let at = rows.partition_point(|r| r.id < row.id);
        rows.insert(at, row);
    }

    /// Append rows with only an `id` column
    pub fn insert_ids(&self, table: &str, ids: impl IntoIterator<Item = RowId>) {
        for id in ids {
            self.insert(
                table,
                Row::new(id, vec![("id".to_string(), Value::Integer(id))]),
            );
        }
    }

    /// Make fetches from `table` report unavailable
    pub fn set_unavailable(&self, table: &str, unavailable: bool) {
        let mut inner = self.lock();
        if unavailable {
            inner.unavailable.insert(table.to_string());
        } else {
            inner.unavailable.remove(table);
        }
    }

    /// Make `reopen` fail
    pub fn fail_reopen(&self, fail: bool) {
        self.lock().fail_reopen = fail;
    }

    /// Make the next `times` table listings report unavailable
    pub fn fail_listing(&self, times: usize) {
        self.lock().failed_listings = times;
    }

    /// Number of `reopen` calls so far
    pub fn reopen_count(&self) -> usize {
        self.lock().reopens
    }

    /// Every fetch as `(table, after_id, limit)`, in call order
    pub fn fetch_log(&self) -> Vec<(String, RowId, usize)> {
        self.lock().fetches.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn list_tracked_tables(&mut self) -> Result<Vec<String>> {
        let mut inner = self.lock();
        if inner.failed_listings > 0 {
            inner.failed_listings -= 1;
            return Err(Error::unavailable("database is locked"));
        }
        Ok(inner
            .tables
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn fetch_batch(&mut self, table: &str, after_id: RowId, limit: usize) -> FetchResult {
        let mut inner = self.lock();
        inner.fetches.push((table.to_string(), after_id, limit));

        if inner.unavailable.contains(table) {
            return FetchResult::Unavailable(format!("table '{table}' is unavailable"));
        }

        let Some((_, rows)) = inner.tables.iter().find(|(n, _)| n == table) else {
            return FetchResult::Unavailable(format!("no such table: {table}"));
        };

        let batch = rows
            .iter()
            .filter(|r| r.id > after_id)
            .take(limit)
            .cloned()
            .collect();
        FetchResult::from_rows(batch)
    }

    async fn reopen(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.reopens += 1;
        if inner.fail_reopen {
            return Err(Error::unavailable("reopen refused"));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
