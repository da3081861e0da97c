//! Tests for YAML loader module

use super::*;
use crate::config::{CursorStoreConfig, DEFAULT_CURSOR_TABLE};
use crate::error::Error;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_config() {
    let yaml = r#"
source:
  path: /var/log/app.db
cursor_store:
  type: sqlite
  path: /var/lib/rowtail/since.db
"#;

    let config = load_config_from_str(yaml).unwrap();
    assert_eq!(config.source.path, PathBuf::from("/var/log/app.db"));
    assert_eq!(config.source.id_column, "id");
    assert!(config.source.tables.is_none());
    assert!(config.source.exclude_tables.is_empty());
    assert_eq!(
        config.cursor_store,
        CursorStoreConfig::Sqlite {
            path: PathBuf::from("/var/lib/rowtail/since.db"),
            table: DEFAULT_CURSOR_TABLE.to_string(),
        }
    );
    assert_eq!(config.polling.batch_size, 5);
    assert_eq!(config.polling.sleep_min_ms, 10);
    assert_eq!(config.polling.sleep_max_ms, 5000);
    assert!(config.event.host.is_none());
}

#[test]
fn test_load_full_config() {
    let yaml = r#"
source:
  path: /data/1Cv8.lgd
  id_column: rowID
  tables: [EventLog]
  exclude_tables: [audit]
  queries:
    EventLog: "SELECT e.date AS rowID, u.name AS UserName FROM EventLog e LEFT JOIN UserCodes u ON e.userCode = u.code WHERE e.date > ?1 ORDER BY e.date LIMIT ?2"
  busy_timeout_ms: 250
cursor_store:
  type: duckdb
  path: /data/cursors.duckdb
  table: offsets
polling:
  batch_size: 100
  sleep_min_ms: 50
  sleep_max_ms: 10000
event:
  host: collector-1
  source_label: sqlite://collector-1/data/1Cv8.lgd
  base_name: accounting
"#;

    let config = load_config_from_str(yaml).unwrap();
    assert_eq!(config.source.id_column, "rowID");
    assert_eq!(config.source.tables, Some(vec!["EventLog".to_string()]));
    assert_eq!(config.source.exclude_tables, vec!["audit".to_string()]);
    assert!(config.source.queries["EventLog"].contains("LEFT JOIN UserCodes"));
    assert_eq!(config.source.busy_timeout_ms, 250);
    assert_eq!(config.cursor_store.table(), Some("offsets"));
    assert_eq!(config.polling.batch_size, 100);
    assert_eq!(config.polling.sleep_min().as_millis(), 50);
    assert_eq!(config.polling.sleep_max().as_secs(), 10);
    assert_eq!(config.event.host.as_deref(), Some("collector-1"));
    assert_eq!(config.event.base_name.as_deref(), Some("accounting"));
}

#[test]
fn test_load_json_and_memory_stores() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: json
  path: cursors.json
"#;
    let config = load_config_from_str(yaml).unwrap();
    assert_eq!(
        config.cursor_store,
        CursorStoreConfig::Json {
            path: PathBuf::from("cursors.json")
        }
    );
    assert!(config.cursor_store.table().is_none());

    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: memory
"#;
    let config = load_config_from_str(yaml).unwrap();
    assert_eq!(config.cursor_store, CursorStoreConfig::Memory);
    assert!(config.cursor_store.path().is_none());
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tail.yaml");
    std::fs::write(
        &path,
        "source:\n  path: app.db\ncursor_store:\n  type: memory\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.source.path, PathBuf::from("app.db"));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/tail.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_invalid_yaml() {
    let err = load_config_from_str("source: [").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_unknown_store_type() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: redis
"#;
    assert!(load_config_from_str(yaml).is_err());
}

#[test]
fn test_zero_batch_size_rejected() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: memory
polling:
  batch_size: 0
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("polling.batch_size"));
}

#[test]
fn test_zero_sleep_rejected() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: memory
polling:
  sleep_min_ms: 0
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("polling.sleep_min_ms"));
}

#[test]
fn test_sleep_min_above_max_rejected() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: memory
polling:
  sleep_min_ms: 6000
  sleep_max_ms: 5000
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("exceeds sleep_max_ms"));
}

#[test]
fn test_empty_source_path_rejected() {
    let yaml = r#"
source:
  path: ""
cursor_store:
  type: memory
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

#[test]
fn test_empty_cursor_table_rejected() {
    let yaml = r#"
source:
  path: app.db
cursor_store:
  type: sqlite
  path: since.db
  table: " "
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("cursor_store.table"));
}

#[test]
fn test_empty_query_rejected() {
    let yaml = r#"
source:
  path: app.db
  queries:
    weblogs: ""
cursor_store:
  type: memory
"#;
    let err = load_config_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("source.queries.weblogs"));
}
