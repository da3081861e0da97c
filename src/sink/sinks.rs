//! Concrete event sinks

use super::{Event, EventSink};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

// ============================================================================
// Channel
// ============================================================================

/// Forwards events into a bounded channel (the downstream queue)
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    /// Wrap an existing sender
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Create a sink and its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::sink("event receiver dropped"))
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes one JSON document per event
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    pretty: bool,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Compact output, one event per line
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Pretty-printed output
    pub fn pretty(writer: W) -> Self {
        Self {
            writer,
            pretty: true,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write an already-built event synchronously
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, event)
        } else {
            serde_json::to_writer(&mut self.writer, event)
        };
        written.map_err(|e| Error::sink(format!("Failed to encode event: {e}")))?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| Error::sink(format!("Failed to write event: {e}")))
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    async fn emit(&mut self, event: Event) -> Result<()> {
        self.write_event(&event)
    }
}

// ============================================================================
// Collect
// ============================================================================

#[derive(Debug, Default)]
struct Collected {
    events: Vec<Event>,
    fail_after: Option<usize>,
}

/// Keeps events in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct CollectSink {
    inner: Arc<Mutex<Collected>>,
}

impl CollectSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every event once `n` events have been accepted
    pub fn fail_after(&self, n: usize) {
        self.lock().fail_after = Some(n);
    }

    /// Events received so far
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Row identifiers received for `table`, in order
    pub fn ids(&self, table: &str) -> Vec<i64> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.table == table)
            .map(Event::id)
            .collect()
    }

    /// Number of events received
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Check if nothing was received
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventSink for CollectSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        let mut inner = self.lock();
        let limit = inner.fail_after;
        if limit.is_some_and(|n| inner.events.len() >= n) {
            return Err(Error::sink("sink closed"));
        }
        inner.events.push(event);
        Ok(())
    }
}
