//! Event envelope
//!
//! An event carries the row fields as-is plus where the row came from.

use crate::config::EnvelopeConfig;
use crate::types::{Row, RowId};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Metadata shared by every event of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Host the collector runs on
    pub host: String,
    /// Source path or label
    pub source: String,
    /// Optional logical base name
    pub base_name: Option<String>,
}

impl Envelope {
    /// Create an envelope with explicit values
    pub fn new(host: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            source: source.into(),
            base_name: None,
        }
    }

    /// Set the base name
    #[must_use]
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    /// Build from config, falling back to the system host name and the
    /// source's own description
    pub fn from_config(config: &EnvelopeConfig, source_description: &str) -> Self {
        let host = config.host.clone().unwrap_or_else(system_host_name);
        let source = config
            .source_label
            .clone()
            .unwrap_or_else(|| source_description.to_string());
        Self {
            host,
            source,
            base_name: config.base_name.clone(),
        }
    }

    /// Wrap a row for `table`
    pub fn wrap(&self, table: &str, row: Row) -> Event {
        Event {
            timestamp: Utc::now(),
            host: self.host.clone(),
            source: self.source.clone(),
            base_name: self.base_name.clone(),
            table: table.to_string(),
            row,
        }
    }
}

fn system_host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// One emitted row with its envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// When the row was picked up
    pub timestamp: DateTime<Utc>,
    /// Host the collector runs on
    pub host: String,
    /// Source path or label
    pub source: String,
    /// Optional logical base name
    pub base_name: Option<String>,
    /// Table the row was read from
    pub table: String,
    /// The row itself
    pub row: Row,
}

impl Event {
    /// Identifier of the carried row
    pub fn id(&self) -> RowId {
        self.row.id
    }
}

/// Envelope keys, in output order
const ENVELOPE_KEYS: [&str; 5] = ["@timestamp", "host", "source", "base_name", "table"];

/// Envelope and row fields are one map: a row column named like an envelope
/// key replaces that key's value in place.
impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let timestamp = self
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let envelope = [
            Some(timestamp.as_str()),
            Some(self.host.as_str()),
            Some(self.source.as_str()),
            self.base_name.as_deref(),
            Some(self.table.as_str()),
        ];

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in ENVELOPE_KEYS.into_iter().zip(envelope) {
            if let Some(field) = self.row.get(key) {
                map.serialize_entry(key, field)?;
            } else if let Some(value) = value {
                map.serialize_entry(key, value)?;
            }
        }
        for (name, value) in &self.row.fields {
            if !ENVELOPE_KEYS.contains(&name.as_str()) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}
