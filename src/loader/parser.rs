//! YAML parser for tail configurations
//!
//! Parses and validates config files.

use crate::config::{CursorStoreConfig, TailConfig};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load a tail configuration from a YAML file
///
/// # Examples
///
/// ```ignore
/// let config = load_config("./tail.yaml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TailConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load a tail configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<TailConfig> {
    let config: TailConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate a tail configuration
pub fn validate_config(config: &TailConfig) -> Result<()> {
    if config.source.path.as_os_str().is_empty() {
        return Err(Error::missing_field("source.path"));
    }

    if config.source.id_column.trim().is_empty() {
        return Err(Error::invalid_value("source.id_column", "cannot be empty"));
    }

    if let Some(tables) = &config.source.tables {
        if tables.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::invalid_value(
                "source.tables",
                "table names cannot be empty",
            ));
        }
    }

    for (table, query) in &config.source.queries {
        if query.trim().is_empty() {
            return Err(Error::invalid_value(
                format!("source.queries.{table}"),
                "query cannot be empty",
            ));
        }
    }

    match &config.cursor_store {
        CursorStoreConfig::Sqlite { path, table } | CursorStoreConfig::Duckdb { path, table } => {
            if path.as_os_str().is_empty() {
                return Err(Error::missing_field("cursor_store.path"));
            }
            if table.trim().is_empty() {
                return Err(Error::invalid_value("cursor_store.table", "cannot be empty"));
            }
        }
        CursorStoreConfig::Json { path } => {
            if path.as_os_str().is_empty() {
                return Err(Error::missing_field("cursor_store.path"));
            }
        }
        CursorStoreConfig::Memory => {}
    }

    let polling = &config.polling;
    if polling.batch_size == 0 {
        return Err(Error::invalid_value(
            "polling.batch_size",
            "must be at least 1",
        ));
    }
    if polling.sleep_min_ms == 0 {
        return Err(Error::invalid_value(
            "polling.sleep_min_ms",
            "must be positive",
        ));
    }
    if polling.sleep_max_ms == 0 {
        return Err(Error::invalid_value(
            "polling.sleep_max_ms",
            "must be positive",
        ));
    }
    if polling.sleep_min_ms > polling.sleep_max_ms {
        return Err(Error::invalid_value(
            "polling.sleep_min_ms",
            format!(
                "{} exceeds sleep_max_ms {}",
                polling.sleep_min_ms, polling.sleep_max_ms
            ),
        ));
    }

    Ok(())
}
