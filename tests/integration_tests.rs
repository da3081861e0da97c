//! Integration tests against on-disk databases
//!
//! Tests the full end-to-end flow: YAML config → SQLite source → events and
//! persisted cursors, including restarts.

use pretty_assertions::assert_eq;
use rowtail::engine::{PollScheduler, SchedulerState};
use rowtail::loader::load_config_from_str;
use rowtail::sink::CollectSink;
use rowtail::store::open_store;
use rowtail::types::Cursor;
use rowtail::TailConfig;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn create_weblogs(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE weblogs (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             ip TEXT,
             request TEXT,
             response INTEGER);
         CREATE TABLE audit (
             id INTEGER PRIMARY KEY,
             action TEXT);",
    )
    .unwrap();
}

fn insert_weblogs(path: &Path, count: usize) {
    let conn = Connection::open(path).unwrap();
    for i in 0..count {
        conn.execute(
            "INSERT INTO weblogs (ip, request, response) VALUES ('10.0.0.1', ?1, 200)",
            [format!("/page/{i}")],
        )
        .unwrap();
    }
}

fn config(dir: &TempDir, store: &str) -> TailConfig {
    let source = dir.path().join("app.db");
    let yaml = format!(
        "source:
  path: '{}'
cursor_store:
{store}
polling:
  batch_size: 5
  sleep_min_ms: 5
  sleep_max_ms: 20
event:
  host: collector-1
  base_name: weblogs-app
",
        source.display()
    );
    load_config_from_str(&yaml).unwrap()
}

fn sqlite_store(dir: &TempDir) -> String {
    format!(
        "  type: sqlite\n  path: '{}'",
        dir.path().join("since.db").display()
    )
}

async fn drain(config: &TailConfig, sink: &CollectSink) -> u64 {
    let mut scheduler = PollScheduler::from_config(config, Box::new(sink.clone())).unwrap();
    scheduler.run_until_idle().await.unwrap().rows
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_tail_sqlite_with_sqlite_cursors() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 12);

    let config = config(&dir, &sqlite_store(&dir));
    let sink = CollectSink::new();
    assert_eq!(drain(&config, &sink).await, 12);

    assert_eq!(sink.ids("weblogs"), (1..=12).collect::<Vec<_>>());
    assert!(sink.ids("audit").is_empty());

    let mut store = open_store(&config.cursor_store).unwrap();
    assert_eq!(
        store.list().await.unwrap(),
        vec![Cursor::new("audit", 0), Cursor::new("weblogs", 12)]
    );
}

#[tokio::test]
async fn test_restart_resumes_from_stored_cursor() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 7);

    let config = config(&dir, &sqlite_store(&dir));
    let first = CollectSink::new();
    drain(&config, &first).await;
    assert_eq!(first.ids("weblogs"), (1..=7).collect::<Vec<_>>());

    insert_weblogs(&source, 3);

    let second = CollectSink::new();
    assert_eq!(drain(&config, &second).await, 3);
    assert_eq!(second.ids("weblogs"), vec![8, 9, 10]);
}

#[tokio::test]
async fn test_cursor_table_in_source_database_is_not_tailed() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 2);

    let store = format!("  type: sqlite\n  path: '{}'", source.display());
    let config = config(&dir, &store);

    let sink = CollectSink::new();
    let mut scheduler = PollScheduler::from_config(&config, Box::new(sink.clone())).unwrap();
    scheduler.run_until_idle().await.unwrap();

    let tables: Vec<_> = scheduler.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["weblogs", "audit"]);
    assert!(sink.ids("path_since").is_empty());

    let conn = Connection::open(&source).unwrap();
    let place: i64 = conn
        .query_row(
            "SELECT place FROM path_since WHERE \"table\" = 'weblogs'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(place, 2);
}

#[tokio::test]
async fn test_tail_with_json_cursor_file() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 4);

    let cursor_file = dir.path().join("cursors.json");
    let store = format!("  type: json\n  path: '{}'", cursor_file.display());
    let config = config(&dir, &store);

    drain(&config, &CollectSink::new()).await;

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&cursor_file).unwrap()).unwrap();
    assert_eq!(saved["cursors"]["weblogs"], 4);

    insert_weblogs(&source, 1);
    let sink = CollectSink::new();
    drain(&config, &sink).await;
    assert_eq!(sink.ids("weblogs"), vec![5]);
}

#[tokio::test]
async fn test_tail_with_duckdb_cursors() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 6);

    let store = format!(
        "  type: duckdb\n  path: '{}'\n  table: offsets",
        dir.path().join("cursors.duckdb").display()
    );
    let config = config(&dir, &store);

    drain(&config, &CollectSink::new()).await;

    let mut store = open_store(&config.cursor_store).unwrap();
    assert_eq!(store.get("weblogs").await.unwrap(), 6);
}

#[tokio::test]
async fn test_sink_failure_keeps_forwarded_rows_committed() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 8);

    let config = config(&dir, &sqlite_store(&dir));

    let failing = CollectSink::new();
    failing.fail_after(3);
    let mut scheduler = PollScheduler::from_config(&config, Box::new(failing.clone())).unwrap();
    let err = scheduler.run().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    // The next run picks up after the last accepted row: nothing lost
    let sink = CollectSink::new();
    drain(&config, &sink).await;
    assert_eq!(failing.ids("weblogs"), vec![1, 2, 3]);
    assert_eq!(sink.ids("weblogs"), vec![4, 5, 6, 7, 8]);
}

#[tokio::test]
async fn test_event_envelope_fields() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 1);

    let config = config(&dir, &sqlite_store(&dir));
    let sink = CollectSink::new();
    drain(&config, &sink).await;

    let events = sink.events();
    let value = serde_json::to_value(&events[0]).unwrap();
    assert!(value["@timestamp"].is_string());
    assert_eq!(value["host"], "collector-1");
    assert_eq!(value["source"], source.display().to_string());
    assert_eq!(value["base_name"], "weblogs-app");
    assert_eq!(value["table"], "weblogs");
    assert_eq!(value["id"], 1);
    assert_eq!(value["request"], "/page/0");
    assert_eq!(value["response"], 200);
}

#[tokio::test]
async fn test_custom_projection_query() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("events.db");
    {
        let conn = Connection::open(&source).unwrap();
        conn.execute_batch(
            "CREATE TABLE UserCodes (code INTEGER, name TEXT);
             CREATE TABLE EventLog (date INTEGER, userCode INTEGER, comment TEXT);
             INSERT INTO UserCodes VALUES (1, 'alice');
             INSERT INTO EventLog VALUES (1000, 1, 'login'), (2000, 1, 'logout');",
        )
        .unwrap();
    }

    let yaml = format!(
        "source:
  path: '{}'
  id_column: rowID
  tables: [EventLog]
  queries:
    EventLog: >-
      SELECT e.date AS rowID, u.name AS UserName, e.comment AS Comment
      FROM EventLog AS e LEFT JOIN UserCodes AS u ON e.userCode = u.code
      WHERE e.date > ?1 ORDER BY e.date LIMIT ?2
cursor_store:
  type: memory
",
        source.display()
    );
    let config = load_config_from_str(&yaml).unwrap();

    let sink = CollectSink::new();
    assert_eq!(drain(&config, &sink).await, 2);

    let value = serde_json::to_value(&sink.events()[1]).unwrap();
    assert_eq!(value["rowID"], 2000);
    assert_eq!(value["UserName"], "alice");
    assert_eq!(value["Comment"], "logout");
}

// ============================================================================
// Live Tail Tests
// ============================================================================

#[tokio::test]
async fn test_live_tail_picks_up_new_rows_until_stopped() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");
    create_weblogs(&source);
    insert_weblogs(&source, 2);

    let config = config(&dir, &sqlite_store(&dir));
    let sink = CollectSink::new();
    let mut scheduler = PollScheduler::from_config(&config, Box::new(sink.clone())).unwrap();
    let stop = scheduler.stop_handle();
    let handle = tokio::spawn(async move {
        let result = scheduler.run().await;
        (scheduler, result)
    });

    // Rows committed by another connection while the loop is idle
    tokio::time::sleep(Duration::from_millis(50)).await;
    insert_weblogs(&source, 3);

    let seen = tokio::time::timeout(Duration::from_secs(5), async {
        while sink.len() < 5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    stop.cancel();

    let (scheduler, result) = handle.await.unwrap();
    assert!(seen.is_ok(), "new rows were not picked up");
    let summary = result.unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(summary.rows, 5);
    assert!(summary.idle_cycles >= 1);
    assert_eq!(sink.ids("weblogs"), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_waits_for_missing_database_at_startup() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.db");

    let config = config(&dir, &sqlite_store(&dir));
    let sink = CollectSink::new();
    let mut scheduler = PollScheduler::from_config(&config, Box::new(sink.clone())).unwrap();
    let stop = scheduler.stop_handle();
    let handle = tokio::spawn(async move {
        let result = scheduler.run().await;
        (scheduler, result)
    });

    // The database shows up, complete, after the collector started
    tokio::time::sleep(Duration::from_millis(50)).await;
    let staging = dir.path().join("staging.db");
    create_weblogs(&staging);
    insert_weblogs(&staging, 2);
    std::fs::rename(&staging, &source).unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), async {
        while sink.len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    stop.cancel();

    let (scheduler, result) = handle.await.unwrap();
    assert!(seen.is_ok(), "rows were not picked up once the database appeared");
    assert!(result.is_ok());
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(sink.ids("weblogs"), vec![1, 2]);
}
