//! Polling engine
//!
//! Moves rows from a [`RowSource`](crate::source::RowSource) to an
//! [`EventSink`](crate::sink::EventSink), persisting a cursor per table.
//!
//! # Overview
//!
//! The engine module provides:
//! - `TablePoller` - one fetch/forward/commit step for a single table
//! - `PollScheduler` - cycles over every table with idle backoff
//! - `IdleBackoff` - doubling sleep between idle cycles

mod backoff;
mod poller;
mod scheduler;
mod types;

pub use backoff::IdleBackoff;
pub use poller::TablePoller;
pub use scheduler::PollScheduler;
pub use types::{CycleReport, PollOutcome, RunSummary, SchedulerState, TableState};
