//! Integration tests for the aggregation loop
//!
//! Full cycles against real SQLite sources and both document sinks, plus
//! scripted connectors for connection-retry and publish-failure scenarios.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use statflow::sink::json_sink::DocumentDir;
use statflow::sink::latest_snapshot;
use statflow::{
    AggregationScheduler, ConnectionError, ConnectionSupervisor, Connector, CycleOutcome,
    CycleStats, DataPointSample, DataSource, DocumentSink, JsonDocumentSink, ReadError,
    SqliteDataSource, SqliteDocumentSink, WriteError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

const RETRY_DELAY: Duration = Duration::from_millis(2);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn supervisor() -> ConnectionSupervisor {
    ConnectionSupervisor::new(5, RETRY_DELAY)
}

fn create_source_db(dir: &Path, rows: &[(f64, f64)]) -> PathBuf {
    let db_path = dir.join("measurements.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute(
        "CREATE TABLE IF NOT EXISTS data_points (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            min_value REAL NOT NULL,
            max_value REAL NOT NULL,
            user_id INTEGER
        )",
        [],
    )
    .unwrap();
    insert_rows(&db_path, rows);
    db_path
}

fn insert_rows(db_path: &Path, rows: &[(f64, f64)]) {
    let conn = Connection::open(db_path).unwrap();
    for (min, max) in rows {
        conn.execute(
            "INSERT INTO data_points (min_value, max_value, user_id) VALUES (?1, ?2, 7)",
            params![min, max],
        )
        .unwrap();
    }
}

/// Source whose first `fail_connects` connection attempts are refused
struct FlakySource {
    fail_connects: u32,
    rows: Vec<DataPointSample>,
    connects: AtomicU32,
    releases: AtomicU32,
}

impl FlakySource {
    fn new(fail_connects: u32, rows: &[(f64, f64)]) -> Self {
        Self {
            fail_connects,
            rows: rows.iter().copied().map(DataPointSample::from).collect(),
            connects: AtomicU32::new(0),
            releases: AtomicU32::new(0),
        }
    }

    /// Connections that actually opened
    fn opened(&self) -> u32 {
        self.connects.load(Ordering::SeqCst).saturating_sub(self.fail_connects)
    }
}

#[async_trait]
impl Connector for FlakySource {
    type Handle = u32;

    async fn connect(&self) -> Result<u32, ConnectionError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.fail_connects {
            return Err(ConnectionError::Unavailable(format!("mysql restarting (attempt {})", n)));
        }
        Ok(n)
    }

    async fn ping(&self, _handle: &mut u32) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn release(&self, _handle: u32) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn backend_type(&self) -> &'static str {
        "FlakySource"
    }
}

#[async_trait]
impl DataSource for FlakySource {
    async fn read_samples(&self, _handle: &mut u32) -> Result<Vec<DataPointSample>, ReadError> {
        Ok(self.rows.clone())
    }
}

/// JSON sink that rejects its first `reject_writes` upserts
struct FlakySink {
    inner: JsonDocumentSink,
    reject_writes: u32,
    writes: AtomicU32,
    connects: AtomicU32,
    releases: AtomicU32,
}

impl FlakySink {
    fn new(dir: &Path, reject_writes: u32) -> Self {
        Self {
            inner: JsonDocumentSink::new(dir),
            reject_writes,
            writes: AtomicU32::new(0),
            connects: AtomicU32::new(0),
            releases: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Connector for FlakySink {
    type Handle = DocumentDir;

    async fn connect(&self) -> Result<DocumentDir, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect().await
    }

    async fn ping(&self, handle: &mut DocumentDir) -> Result<(), ConnectionError> {
        self.inner.ping(handle).await
    }

    async fn release(&self, handle: DocumentDir) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(handle).await
    }

    fn backend_type(&self) -> &'static str {
        "FlakySink"
    }
}

#[async_trait]
impl DocumentSink for FlakySink {
    async fn replace_document(
        &self,
        handle: &mut DocumentDir,
        doc_type: &str,
        document: &Value,
    ) -> Result<(), WriteError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.reject_writes {
            return Err(WriteError::Backend("write concern not satisfied".to_string()));
        }
        self.inner.replace_document(handle, doc_type, document).await
    }

    async fn find_document(
        &self,
        handle: &mut DocumentDir,
        doc_type: &str,
    ) -> Result<Option<Value>, ReadError> {
        self.inner.find_document(handle, doc_type).await
    }
}

fn read_json_snapshot(dir: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(dir.join("descriptive_statistics.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

fn sqlite_document_count(db_path: &Path) -> i64 {
    Connection::open(db_path)
        .unwrap()
        .query_row("SELECT COUNT(*) FROM statistics", [], |row| row.get(0))
        .unwrap()
}

fn setup_dirs() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let documents = dir.path().join("documents");
    (dir, documents)
}

#[tokio::test]
async fn test_cycle_publishes_snapshot_to_json_store() {
    let (dir, documents) = setup_dirs();
    let db_path = create_source_db(dir.path(), &[(1.0, 5.0), (2.0, 8.0)]);

    let mut scheduler = AggregationScheduler::new(
        SqliteDataSource::new(&db_path),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Published { count: 4 });

    let document = read_json_snapshot(&documents).expect("snapshot document written");
    assert_eq!(document["type"], "descriptive_statistics");
    assert_eq!(document["min"], 1.0);
    assert_eq!(document["max"], 8.0);
    assert_eq!(document["average"], 4.5);
    assert_eq!(document["median"], 5.0);
    assert_eq!(document["count"], 4);
    assert!(document["timestamp"].is_string());
}

#[tokio::test]
async fn test_cycles_overwrite_single_sqlite_document() {
    let dir = tempdir().unwrap();
    let db_path = create_source_db(dir.path(), &[(1.0, 5.0)]);
    let analytics = dir.path().join("analytics.db");

    let mut scheduler = AggregationScheduler::new(
        SqliteDataSource::new(&db_path),
        SqliteDocumentSink::new(&analytics),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.tick().await, CycleOutcome::Published { count: 2 });
    assert_eq!(scheduler.tick().await, CycleOutcome::Published { count: 2 });
    assert_eq!(sqlite_document_count(&analytics), 1);

    // New rows are picked up by the next full re-read
    insert_rows(&db_path, &[(2.0, 8.0)]);
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Published { count: 4 });
    assert_eq!(sqlite_document_count(&analytics), 1);

    let sink = scheduler.sink();
    let handle = sink.connect().await.unwrap();
    let snapshot = latest_snapshot(sink, handle).await.unwrap().unwrap();
    assert_eq!(snapshot.count, 4);
    assert_eq!(snapshot.min, Some(1.0));
    assert_eq!(snapshot.max, Some(8.0));
    assert_eq!(snapshot.median, Some(5.0));
    assert_eq!(snapshot.average, Some(4.5));

    assert_eq!(
        scheduler.stats(),
        CycleStats { cycles: 3, published: 3, skipped: 0, failed: 0 }
    );
}

#[tokio::test]
async fn test_empty_table_skips_publish() {
    let (dir, documents) = setup_dirs();
    let db_path = create_source_db(dir.path(), &[]);

    let mut scheduler = AggregationScheduler::new(
        SqliteDataSource::new(&db_path),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::SkippedEmpty);
    assert!(read_json_snapshot(&documents).is_none());
    assert_eq!(scheduler.stats().skipped, 1);
}

#[tokio::test]
async fn test_read_error_is_counted_as_failure() {
    let (dir, documents) = setup_dirs();
    let db_path = dir.path().join("measurements.db");
    Connection::open(&db_path)
        .unwrap()
        .execute("CREATE TABLE unrelated (x INTEGER)", [])
        .unwrap();

    let mut scheduler = AggregationScheduler::new(
        SqliteDataSource::new(&db_path),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );

    let outcome = scheduler.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::ReadFailed);
    assert!(outcome.is_failure());
    assert_eq!(scheduler.stats().failed, 1);
    assert_eq!(scheduler.stats().skipped, 0);
    assert!(read_json_snapshot(&documents).is_none());
}

#[tokio::test]
async fn test_recovers_within_retry_budget() {
    let (_dir, documents) = setup_dirs();
    let mut scheduler = AggregationScheduler::new(
        FlakySource::new(4, &[(1.0, 5.0), (2.0, 8.0)]),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Published { count: 4 });
    assert_eq!(scheduler.source().connects.load(Ordering::SeqCst), 5);
    assert_eq!(scheduler.source().releases.load(Ordering::SeqCst), 1);
    assert!(read_json_snapshot(&documents).is_some());
}

#[tokio::test]
async fn test_exhausted_retries_abort_cycle_then_next_cycle_retries() {
    let (_dir, documents) = setup_dirs();
    let mut scheduler = AggregationScheduler::new(
        FlakySource::new(5, &[(1.0, 5.0)]),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.tick().await, CycleOutcome::SourceUnavailable);
    assert_eq!(scheduler.source().connects.load(Ordering::SeqCst), 5);
    assert_eq!(scheduler.source().releases.load(Ordering::SeqCst), 0);
    assert!(read_json_snapshot(&documents).is_none());

    // Sixth attempt, in a fresh cycle, succeeds
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Published { count: 2 });
    assert_eq!(scheduler.source().connects.load(Ordering::SeqCst), 6);
    assert_eq!(scheduler.source().opened(), scheduler.source().releases.load(Ordering::SeqCst));

    assert_eq!(
        scheduler.stats(),
        CycleStats { cycles: 2, published: 1, skipped: 0, failed: 1 }
    );
}

#[tokio::test]
async fn test_publish_failure_does_not_stop_next_cycle() {
    let (_dir, documents) = setup_dirs();
    let mut scheduler = AggregationScheduler::new(
        FlakySource::new(0, &[(1.0, 5.0), (2.0, 8.0)]),
        FlakySink::new(&documents, 1),
        supervisor(),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.tick().await, CycleOutcome::PublishFailed);
    assert!(read_json_snapshot(&documents).is_none());

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Published { count: 4 });
    assert_eq!(read_json_snapshot(&documents).unwrap()["median"], 5.0);

    // Every handle opened in either cycle was released
    let sink = scheduler.sink();
    assert_eq!(sink.connects.load(Ordering::SeqCst), 2);
    assert_eq!(sink.releases.load(Ordering::SeqCst), 2);
    let source = scheduler.source();
    assert_eq!(source.connects.load(Ordering::SeqCst), 2);
    assert_eq!(source.releases.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unavailable_document_store_drops_snapshot() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("documents");
    std::fs::write(&blocker, b"a file where the directory should be").unwrap();

    let mut scheduler = AggregationScheduler::new(
        FlakySource::new(0, &[(1.0, 5.0)]),
        JsonDocumentSink::new(&blocker),
        ConnectionSupervisor::new(2, RETRY_DELAY),
        POLL_INTERVAL,
    );

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::SinkUnavailable);
    assert_eq!(scheduler.source().releases.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.stats().failed, 1);
}

#[tokio::test]
async fn test_verify_backends() {
    let (dir, documents) = setup_dirs();
    let db_path = create_source_db(dir.path(), &[]);

    let reachable = AggregationScheduler::new(
        SqliteDataSource::new(&db_path),
        JsonDocumentSink::new(&documents),
        supervisor(),
        POLL_INTERVAL,
    );
    assert!(reachable.verify_backends().await.is_ok());

    let missing = AggregationScheduler::new(
        SqliteDataSource::new(dir.path().join("nope.db")),
        JsonDocumentSink::new(&documents),
        ConnectionSupervisor::new(2, RETRY_DELAY),
        POLL_INTERVAL,
    );
    let err = missing.verify_backends().await.unwrap_err();
    assert!(matches!(err, ConnectionError::RetriesExhausted { attempts: 2, .. }));
}
