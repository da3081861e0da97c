//! In-memory cursor store
//!
//! Clones share the same underlying map, so a caller can keep a handle and
//! inspect what the poller wrote.

use super::{CursorStore, InitOutcome};
use crate::error::{Error, Result};
use crate::types::{Cursor, RowId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    initialized: bool,
    cursors: BTreeMap<String, RowId>,
    /// Only kept when recording
    writes: Option<Vec<Cursor>>,
    fail_writes: bool,
}

/// Process-local cursor store
#[derive(Debug, Clone, Default)]
pub struct MemoryCursorStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCursorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with cursors
    pub fn with_cursors<I, S>(cursors: I) -> Self
    where
        I: IntoIterator<Item = (S, RowId)>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            inner.initialized = true;
            inner.cursors = cursors.into_iter().map(|(t, p)| (t.into(), p)).collect();
        }
        store
    }

    /// Current position for a table without creating it
    pub fn position(&self, table: &str) -> Option<RowId> {
        self.lock().cursors.get(table).copied()
    }

    /// Create an empty store that keeps a log of every `set` call
    pub fn recording() -> Self {
        let store = Self::new();
        store.lock().writes = Some(Vec::new());
        store
    }

    /// Every `set` call observed, in order; empty unless created with
    /// [`MemoryCursorStore::recording`]
    pub fn writes(&self) -> Vec<Cursor> {
        self.lock().writes.clone().unwrap_or_default()
    }

    /// Make subsequent `set` calls fail with a storage error
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn ensure_initialized(&mut self) -> Result<InitOutcome> {
        let mut inner = self.lock();
        if inner.initialized {
            return Ok(InitOutcome::AlreadyExists);
        }
        inner.initialized = true;
        Ok(InitOutcome::Created)
    }

    async fn load_existing(&mut self) -> Result<bool> {
        Ok(self.lock().initialized)
    }

    async fn get(&mut self, table: &str) -> Result<RowId> {
        let mut inner = self.lock();
        Ok(*inner.cursors.entry(table.to_string()).or_insert(0))
    }

    async fn set(&mut self, table: &str, position: RowId) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(Error::storage(format!(
                "write rejected for table '{table}'"
            )));
        }
        inner.cursors.insert(table.to_string(), position);
        if let Some(writes) = inner.writes.as_mut() {
            writes.push(Cursor::new(table, position));
        }
        Ok(())
    }

    async fn list(&mut self) -> Result<Vec<Cursor>> {
        Ok(self
            .lock()
            .cursors
            .iter()
            .map(|(table, position)| Cursor::new(table.clone(), *position))
            .collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
