//! Single-table poll step

use super::types::{PollOutcome, TableState};
use crate::error::Result;
use crate::sink::{Envelope, EventSink};
use crate::source::{FetchResult, RowSource};
use crate::store::CursorStore;
use tracing::{debug, warn};

/// Fetches one batch for a table, forwards it and persists the cursor
#[derive(Debug, Clone, Copy)]
pub struct TablePoller {
    batch_size: usize,
}

impl TablePoller {
    /// Create a poller; a batch size of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Rows requested per fetch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Poll `table` once.
    ///
    /// Rows are forwarded in identifier order and the in-memory cursor moves
    /// with each one. The cursor is written to the store exactly once per
    /// successful fetch, even when the batch is empty. An unavailable source
    /// leaves both cursors untouched.
    ///
    /// If the sink rejects a row, the position of the rows already forwarded
    /// is committed before the sink error is returned.
    pub async fn poll(
        &self,
        table: &mut TableState,
        source: &mut dyn RowSource,
        store: &mut dyn CursorStore,
        sink: &mut dyn EventSink,
        envelope: &Envelope,
    ) -> Result<PollOutcome> {
        let rows = match source
            .fetch_batch(&table.name, table.cursor, self.batch_size)
            .await
        {
            FetchResult::Rows(rows) => rows,
            FetchResult::Empty => Vec::new(),
            FetchResult::Unavailable(reason) => return Ok(PollOutcome::Unavailable(reason)),
        };

        let mut forwarded = 0;
        for row in rows {
            if row.id <= table.cursor {
                warn!(
                    table = %table.name,
                    id = row.id,
                    cursor = table.cursor,
                    "skipping row at or below cursor"
                );
                continue;
            }

            let id = row.id;
            if let Err(e) = sink.emit(envelope.wrap(&table.name, row)).await {
                if forwarded > 0 {
                    store.set(&table.name, table.cursor).await?;
                }
                return Err(e);
            }
            table.cursor = id;
            forwarded += 1;
        }

        store.set(&table.name, table.cursor).await?;
        debug!(table = %table.name, rows = forwarded, cursor = table.cursor, "polled table");

        Ok(PollOutcome::Processed(forwarded))
    }
}

impl Default for TablePoller {
    fn default() -> Self {
        Self::new(crate::config::PollConfig::default().batch_size)
    }
}
