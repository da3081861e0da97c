//! JSON file cursor store
//!
//! Provides file-based cursor persistence with atomic writes.

use super::{CursorStore, InitOutcome};
use crate::error::{Error, Result};
use crate::types::{Cursor, RowId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CursorFile {
    #[serde(default)]
    cursors: BTreeMap<String, RowId>,
}

/// Cursor store persisted as a JSON document
#[derive(Debug)]
pub struct JsonFileCursorStore {
    /// Path to the cursor file
    path: PathBuf,
    /// Current contents (cached)
    state: CursorFile,
}

impl JsonFileCursorStore {
    /// Create a store for the given path. Nothing is read until
    /// [`CursorStore::ensure_initialized`] is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: CursorFile::default(),
        }
    }

    /// Get the cursor file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&mut self) -> Result<()> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::storage(format!("Failed to read cursor file: {e}")))?;

        self.state = if contents.trim().is_empty() {
            CursorFile::default()
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| Error::storage(format!("Failed to parse cursor file: {e}")))?
        };

        Ok(())
    }

    async fn file_exists(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to check cursor file '{}': {e}",
                self.path.display()
            ))
        })
    }

    async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::storage(format!("Failed to serialize cursors: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::storage(format!("Failed to write cursor file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::storage(format!("Failed to rename cursor file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl CursorStore for JsonFileCursorStore {
    async fn ensure_initialized(&mut self) -> Result<InitOutcome> {
        if self.file_exists().await? {
            info!(path = %self.path.display(), "cursor file already exists");
            self.load().await?;
            return Ok(InitOutcome::AlreadyExists);
        }

        info!(path = %self.path.display(), "creating cursor file");
        self.state = CursorFile::default();
        self.save().await?;
        Ok(InitOutcome::Created)
    }

    async fn load_existing(&mut self) -> Result<bool> {
        if !self.file_exists().await? {
            return Ok(false);
        }
        self.load().await?;
        Ok(true)
    }

    async fn get(&mut self, table: &str) -> Result<RowId> {
        if let Some(position) = self.state.cursors.get(table) {
            info!(table, position, "cursor already exists");
            return Ok(*position);
        }

        info!(table, "initializing cursor at 0");
        self.state.cursors.insert(table.to_string(), 0);
        self.save().await?;
        Ok(0)
    }

    async fn set(&mut self, table: &str, position: RowId) -> Result<()> {
        debug!(table, position, "storing cursor");
        self.state.cursors.insert(table.to_string(), position);
        self.save().await
    }

    async fn list(&mut self) -> Result<Vec<Cursor>> {
        Ok(self
            .state
            .cursors
            .iter()
            .map(|(table, position)| Cursor::new(table.clone(), *position))
            .collect())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
