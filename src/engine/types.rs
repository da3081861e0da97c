//! Engine types
//!
//! Per-table state, poll outcomes and run statistics.

use crate::types::RowId;
use std::fmt;

/// In-memory progress for one tracked table
///
/// Loaded from the cursor store once at startup; afterwards this copy is
/// authoritative and only written back, never re-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    /// Table name
    pub name: String,
    /// Identifier of the last forwarded row
    pub cursor: RowId,
}

impl TableState {
    /// Create table state at a known cursor
    pub fn new(name: impl Into<String>, cursor: RowId) -> Self {
        Self {
            name: name.into(),
            cursor,
        }
    }
}

/// Result of polling one table once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Rows forwarded (may be zero)
    Processed(usize),
    /// Source could not be read; cursor untouched
    Unavailable(String),
}

impl PollOutcome {
    /// Rows forwarded by this poll
    pub fn rows(&self) -> usize {
        match self {
            Self::Processed(n) => *n,
            Self::Unavailable(_) => 0,
        }
    }
}

/// Summary of one pass over every tracked table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows forwarded across all tables
    pub rows: usize,
    /// Tables skipped because the source was unavailable
    pub unavailable: Vec<String>,
}

impl CycleReport {
    /// A cycle is idle when no table produced a row
    pub fn is_idle(&self) -> bool {
        self.rows == 0
    }
}

/// Statistics accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles completed
    pub cycles: u64,
    /// Rows forwarded
    pub rows: u64,
    /// Cycles that produced no rows
    pub idle_cycles: u64,
    /// Table polls skipped as unavailable
    pub unavailable_polls: u64,
}

impl RunSummary {
    /// Fold a cycle into the totals
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.rows += report.rows as u64;
        self.unavailable_polls += report.unavailable.len() as u64;
        if report.is_idle() {
            self.idle_cycles += 1;
        }
    }
}

/// Lifecycle of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Cycles are being started
    Running,
    /// Stop requested; the in-flight cycle finishes, no new one starts
    Stopping,
    /// Loop exited
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopping => write!(f, "stopping"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}
