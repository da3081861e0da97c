//! Poll loop over every tracked table

use super::backoff::IdleBackoff;
use super::poller::TablePoller;
use super::types::{CycleReport, PollOutcome, RunSummary, SchedulerState, TableState};
use crate::config::{EnvelopeConfig, PollConfig, TailConfig};
use crate::error::{Error, Result};
use crate::sink::{Envelope, EventSink};
use crate::source::{RowSource, SqliteSource};
use crate::store::{open_store, CursorStore, InitOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives [`TablePoller`] across all tracked tables until stopped
///
/// Cycles run back to back while rows keep arriving. A cycle that forwards
/// nothing puts the loop to sleep with [`IdleBackoff`]; after each sleep the
/// source connection is reopened so that rows committed by other writers
/// become visible. Storage and sink errors end the run.
///
/// A new scheduler is [`SchedulerState::Running`]: it cycles as soon as
/// [`run`](Self::run) is called. A stop request moves it to `Stopping`, and
/// it is `Stopped` once the loop has exited.
pub struct PollScheduler {
    source: Box<dyn RowSource>,
    store: Box<dyn CursorStore>,
    sink: Box<dyn EventSink>,
    envelope: Envelope,
    poller: TablePoller,
    backoff: IdleBackoff,
    tables: Vec<TableState>,
    state: SchedulerState,
    stop: CancellationToken,
    summary: RunSummary,
    initialized: bool,
}

impl PollScheduler {
    /// Create a scheduler over already-opened components
    pub fn new(
        source: Box<dyn RowSource>,
        store: Box<dyn CursorStore>,
        sink: Box<dyn EventSink>,
        config: &PollConfig,
    ) -> Self {
        let envelope = Envelope::from_config(&EnvelopeConfig::default(), &source.describe());
        Self {
            source,
            store,
            sink,
            envelope,
            poller: TablePoller::new(config.batch_size),
            backoff: IdleBackoff::new(config.sleep_min(), config.sleep_max()),
            tables: Vec::new(),
            state: SchedulerState::Running,
            stop: CancellationToken::new(),
            summary: RunSummary::default(),
            initialized: false,
        }
    }

    /// Build the SQLite source and the configured cursor store
    pub fn from_config(config: &TailConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        let store = open_store(&config.cursor_store)?;

        let source = SqliteSource::for_tail(config);
        let envelope = Envelope::from_config(&config.event, &source.describe());
        Ok(Self::new(Box::new(source), store, sink, &config.polling).with_envelope(envelope))
    }

    /// Replace the event envelope
    #[must_use]
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// Use an externally owned stop token
    #[must_use]
    pub fn with_stop_token(mut self, token: CancellationToken) -> Self {
        self.stop = token;
        self
    }

    /// Token that stops the loop when cancelled
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Request a stop; the in-flight cycle completes first
    pub fn stop(&mut self) {
        self.stop.cancel();
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Stopping;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Tracked tables with their in-memory cursors
    pub fn tables(&self) -> &[TableState] {
        &self.tables
    }

    /// Backoff state
    pub fn backoff(&self) -> &IdleBackoff {
        &self.backoff
    }

    /// Totals so far
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Envelope applied to every event
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Prepare the cursor store and load a cursor for every tracked table
    pub async fn initialize(&mut self) -> Result<()> {
        match self.store.ensure_initialized().await? {
            InitOutcome::Created => info!(store = %self.store.describe(), "created cursor store"),
            InitOutcome::AlreadyExists => {
                debug!(store = %self.store.describe(), "cursor store already exists");
            }
        }

        let names = self.source.list_tracked_tables().await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let cursor = self.store.get(&name).await?;
            info!(table = %name, cursor, "tracking table");
            tables.push(TableState::new(name, cursor));
        }

        if tables.is_empty() {
            warn!(source = %self.source.describe(), "no tables to poll");
        }

        self.tables = tables;
        self.initialized = true;
        Ok(())
    }

    /// Poll every tracked table once, in order
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for table in &mut self.tables {
            let outcome = self
                .poller
                .poll(
                    table,
                    self.source.as_mut(),
                    self.store.as_mut(),
                    self.sink.as_mut(),
                    &self.envelope,
                )
                .await?;

            match outcome {
                PollOutcome::Processed(rows) => report.rows += rows,
                PollOutcome::Unavailable(reason) => {
                    warn!(table = %table.name, %reason, "source unavailable, skipping table");
                    report.unavailable.push(table.name.clone());
                }
            }
        }

        self.summary.record(&report);
        Ok(report)
    }

    /// Run cycles until the stop token is cancelled or a fatal error occurs
    ///
    /// A source that is unavailable at startup is retried with the idle
    /// backoff until discovery succeeds or a stop is requested.
    pub async fn run(&mut self) -> Result<RunSummary> {
        if self.stop.is_cancelled() {
            self.state = SchedulerState::Stopping;
        } else {
            self.state = SchedulerState::Running;
        }

        let result = self.start_and_poll().await;
        self.state = SchedulerState::Stopped;

        match result {
            Ok(()) => {
                info!(
                    cycles = self.summary.cycles,
                    rows = self.summary.rows,
                    "polling stopped"
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                error!(error = %e, "polling aborted");
                Err(e)
            }
        }
    }

    /// Run cycles until one forwards nothing, then return without sleeping
    pub async fn run_until_idle(&mut self) -> Result<RunSummary> {
        if !self.initialized {
            self.initialize().await?;
        }

        self.state = SchedulerState::Running;
        let result = self.drain().await;
        self.state = SchedulerState::Stopped;
        result.map(|()| self.summary.clone())
    }

    async fn drain(&mut self) -> Result<()> {
        while !self.stop.is_cancelled() {
            if self.run_cycle().await?.is_idle() {
                break;
            }
        }
        Ok(())
    }

    async fn start_and_poll(&mut self) -> Result<()> {
        if !self.initialized && !self.initialize_with_retry().await? {
            return Ok(());
        }

        info!(
            source = %self.source.describe(),
            store = %self.store.describe(),
            tables = self.tables.len(),
            "polling started"
        );
        self.poll_loop().await
    }

    /// Returns false if stopped before the source came up
    async fn initialize_with_retry(&mut self) -> Result<bool> {
        let stop = self.stop.clone();

        loop {
            if stop.is_cancelled() {
                self.state = SchedulerState::Stopping;
                return Ok(false);
            }

            match self.initialize().await {
                Ok(()) => {
                    self.backoff.reset();
                    return Ok(true);
                }
                Err(Error::SourceUnavailable { message }) => {
                    let delay = self.backoff.next_idle();
                    warn!(
                        reason = %message,
                        sleep_ms = delay.as_millis() as u64,
                        "source unavailable at startup, retrying"
                    );
                    if !sleep_or_stop(&stop, delay).await {
                        self.state = SchedulerState::Stopping;
                        return Ok(false);
                    }
                    if let Err(e) = self.source.reopen().await {
                        warn!(error = %e, "failed to reopen source, retrying");
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn poll_loop(&mut self) -> Result<()> {
        let stop = self.stop.clone();

        loop {
            if stop.is_cancelled() {
                self.state = SchedulerState::Stopping;
                return Ok(());
            }

            let report = self.run_cycle().await?;
            if !report.is_idle() {
                self.backoff.reset();
                continue;
            }

            let delay = self.backoff.next_idle();
            info!(sleep_ms = delay.as_millis() as u64, "no new rows, sleeping");

            if stop.is_cancelled() || !sleep_or_stop(&stop, delay).await {
                self.state = SchedulerState::Stopping;
                return Ok(());
            }

            if let Err(e) = self.source.reopen().await {
                warn!(error = %e, "failed to reopen source, retrying next cycle");
            }
        }
    }
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("source", &self.source.describe())
            .field("store", &self.store.describe())
            .field("tables", &self.tables)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Sleep for `delay`; returns false if `stop` fired first
async fn sleep_or_stop(stop: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        () = stop.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
