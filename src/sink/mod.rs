//! Event sink module
//!
//! Turns fetched rows into events and hands them downstream.
//!
//! # Overview
//!
//! The sink module provides:
//! - `Event` / `Envelope` - row fields plus host and source metadata
//! - `EventSink` - downstream hand-off used by the poller
//! - `ChannelSink`, `JsonLinesSink`, `CollectSink` - concrete sinks

mod event;
mod sinks;

pub use event::{Envelope, Event};
pub use sinks::{ChannelSink, CollectSink, JsonLinesSink};

use crate::error::Result;
use async_trait::async_trait;

/// Receiver of emitted events
///
/// A failing sink is fatal to the poll loop: rows the sink did not accept
/// must not be counted as forwarded.
#[async_trait]
pub trait EventSink: Send {
    /// Forward one event
    async fn emit(&mut self, event: Event) -> Result<()>;
}
