//! Integration tests for scan-indexer
//!
//! These run against SQLite files in temporary directories; the PostgreSQL
//! engine needs a server and is not exercised here.

use rusqlite::Connection;
use scan_indexer::config::DatabaseEngine;
use scan_indexer::db::schema;
use scan_indexer::{
    BackgroundExecutor, ConfigError, DatabaseIndexer, FileRecord, FlushExecutor, IndexConfig,
    InlineExecutor, ShareRecord,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn count(db: &Path, table: &str) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn sqlite_indexer(db: &Path, max: usize, executor: Arc<dyn FlushExecutor>) -> DatabaseIndexer {
    let config = IndexConfig::sqlite(db.to_string_lossy(), max);
    let indexer = DatabaseIndexer::new(&config, executor).unwrap();
    assert!(indexer.setup_connection());
    indexer
}

#[test]
fn test_end_to_end_sqlite_flush() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");
    let indexer = sqlite_indexer(&db, 1000, Arc::new(InlineExecutor));

    indexer.add_share(ShareRecord::new(
        "FS01",
        r"\\FS01\Projects",
        Some("Project data".to_string()),
    ));
    for i in 0..10 {
        indexer.add_file(FileRecord::new(
            format!(r"\\FS01\Projects\report{}.docx", i),
            format!("report{}.docx", i),
            Some(100),
            Some(".docx".to_string()),
        ));
    }
    assert_eq!(indexer.queue_size(), 11);

    indexer.flush();

    assert_eq!(indexer.queue_size(), 0);
    assert_eq!(count(&db, "shares"), 1);
    assert_eq!(count(&db, "files"), 10);

    let conn = Connection::open(&db).unwrap();
    let (computer, sharename, comment): (String, String, Option<String>) = conn
        .query_row("SELECT computer, sharename, comment FROM shares", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!(computer, "FS01");
    assert_eq!(sharename, "Projects");
    assert_eq!(comment.as_deref(), Some("Project data"));

    let total: i64 = conn
        .query_row("SELECT SUM(size) FROM files", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 1000);

    let stats = indexer.stats().snapshot();
    assert_eq!(stats.shares_written, 1);
    assert_eq!(stats.files_written, 10);
    assert_eq!(stats.bytes_indexed, 1000);
    assert_eq!(stats.records_dropped, 0);
}

#[test]
fn test_setup_is_idempotent_and_keeps_rows() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");

    let first = sqlite_indexer(&db, 100, Arc::new(InlineExecutor));
    first.add_file(FileRecord::new("/data/a.txt", "a.txt", Some(1), Some(".txt".into())));
    first.flush_sync();
    assert_eq!(count(&db, "files"), 1);

    // A second run against the same file must not fail or wipe existing rows
    let second = sqlite_indexer(&db, 100, Arc::new(InlineExecutor));
    second.add_file(FileRecord::new("/data/b.txt", "b.txt", Some(2), Some(".txt".into())));
    second.flush_sync();
    assert_eq!(count(&db, "files"), 2);

    let conn = Connection::open(&db).unwrap();
    assert_eq!(
        schema::get_index_info(&conn, schema::keys::SCHEMA_VERSION).unwrap(),
        Some(schema::SCHEMA_VERSION.to_string())
    );
}

#[test]
fn test_share_prefix_mismatch_is_skipped() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");
    let indexer = sqlite_indexer(&db, 100, Arc::new(InlineExecutor));

    indexer.add_share(ShareRecord::new("FS01", r"\\FS02\Other", None));
    indexer.add_share(ShareRecord::new("FS01", r"\\FS01\Home", None));
    indexer.flush_sync();

    assert_eq!(count(&db, "shares"), 1);
    let stats = indexer.stats().snapshot();
    assert_eq!(stats.shares_written, 1);
    assert_eq!(stats.shares_rejected, 1);
    assert_eq!(stats.batches_rolled_back, 0);
}

#[test]
fn test_threshold_is_strictly_greater() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");
    let indexer = sqlite_indexer(&db, 5, Arc::new(InlineExecutor));

    for i in 0..5 {
        indexer.add_file(FileRecord::new(format!("/d/{}", i), i.to_string(), None, None));
    }
    assert!(!indexer.needs_flush());
    assert!(!indexer.flush_if_needed());
    assert_eq!(count(&db, "files"), 0);

    indexer.add_file(FileRecord::new("/d/5", "5", None, None));
    assert!(indexer.needs_flush());
    assert!(indexer.flush_if_needed());

    assert_eq!(indexer.queue_size(), 0);
    assert_eq!(count(&db, "files"), 6);
}

#[test]
fn test_concurrent_producers_with_background_flush() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");
    let executor = Arc::new(BackgroundExecutor::new(2).unwrap());
    let indexer = Arc::new(sqlite_indexer(&db, 50, executor.clone()));

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let indexer = Arc::clone(&indexer);
            thread::spawn(move || {
                for i in 0..250 {
                    indexer.add_file(FileRecord::new(
                        format!("/t{}/f{}", t, i),
                        format!("f{}", i),
                        Some(1),
                        None,
                    ));
                    indexer.flush_if_needed();
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }

    executor.shutdown().unwrap();
    indexer.flush_sync();

    assert_eq!(indexer.queue_size(), 0);
    assert_eq!(count(&db, "files"), 1000);

    let conn = Connection::open(&db).unwrap();
    let mut stmt = conn.prepare("SELECT fullname FROM files").unwrap();
    let names: HashSet<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(names.len(), 1000);

    let stats = indexer.stats().snapshot();
    assert_eq!(stats.files_written, 1000);
    assert_eq!(stats.records_dropped, 0);
}

#[test]
fn test_failed_batch_drops_records() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");

    // Pre-create the table with a constraint the last row violates
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE files (
                id INTEGER PRIMARY KEY,
                fullname TEXT NOT NULL,
                filename TEXT NOT NULL,
                size INTEGER CHECK (size >= 0),
                extension TEXT
            )",
        )
        .unwrap();
    }

    let indexer = sqlite_indexer(&db, 100, Arc::new(InlineExecutor));
    indexer.add_share(ShareRecord::new("FS01", r"\\FS01\Public", None));
    for i in 0..4 {
        indexer.add_file(FileRecord::new(format!("/ok/{}", i), i.to_string(), Some(10), None));
    }
    indexer.add_file(FileRecord::new("/bad", "bad", Some(-1), None));

    indexer.flush_sync();

    // Nothing from the failed batch is written, nothing is re-queued
    assert_eq!(count(&db, "files"), 0);
    assert_eq!(indexer.queue_size(), 0);

    // The shares table is its own transaction
    assert_eq!(count(&db, "shares"), 1);

    let stats = indexer.stats().snapshot();
    assert_eq!(stats.records_dropped, 5);
    assert_eq!(stats.batches_rolled_back, 1);
    assert_eq!(stats.shares_written, 1);

    // Later batches still go through
    indexer.add_file(FileRecord::new("/ok/late", "late", Some(3), None));
    indexer.flush_sync();
    assert_eq!(count(&db, "files"), 1);
}

#[test]
fn test_failure_mid_batch_keeps_unpopped_records() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("index.db");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE files (
                id INTEGER PRIMARY KEY,
                fullname TEXT NOT NULL,
                filename TEXT NOT NULL,
                size INTEGER CHECK (size >= 0),
                extension TEXT
            )",
        )
        .unwrap();
    }

    let indexer = sqlite_indexer(&db, 100, Arc::new(InlineExecutor));
    for i in 0..3 {
        indexer.add_file(FileRecord::new(format!("/before/{}", i), i.to_string(), Some(1), None));
    }
    indexer.add_file(FileRecord::new("/bad", "bad", Some(-1), None));
    for i in 0..3 {
        indexer.add_file(FileRecord::new(format!("/after/{}", i), i.to_string(), Some(1), None));
    }

    indexer.flush_sync();

    assert_eq!(count(&db, "files"), 0);
    assert_eq!(indexer.queue_size(), 3);
    assert_eq!(indexer.stats().snapshot().records_dropped, 4);

    indexer.flush_sync();

    let conn = Connection::open(&db).unwrap();
    let after: i64 = conn
        .query_row("SELECT COUNT(*) FROM files WHERE fullname LIKE '/after/%'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(after, 3);
    assert_eq!(count(&db, "files"), 3);
}

#[test]
fn test_unknown_engine_is_rejected() {
    let mut config = IndexConfig::sqlite("index.db", 10);
    config.engine = "oracle".to_string();

    match DatabaseIndexer::new(&config, Arc::new(InlineExecutor)) {
        Err(ConfigError::UnknownEngine(engine)) => assert_eq!(engine, "oracle"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("unknown engine accepted"),
    }

    assert_eq!("SQLite".parse::<DatabaseEngine>().unwrap(), DatabaseEngine::Sqlite);
}

#[test]
fn test_unreachable_database_fails_setup() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("missing").join("index.db");
    let config = IndexConfig::sqlite(db.to_string_lossy(), 10);
    let indexer = DatabaseIndexer::new(&config, Arc::new(InlineExecutor)).unwrap();

    assert!(!indexer.setup_connection());

    indexer.add_file(FileRecord::new("/a", "a", None, None));
    indexer.flush_sync();

    // Never started, so nothing was popped
    assert_eq!(indexer.queue_size(), 1);
    assert_eq!(indexer.stats().snapshot().flushes_failed, 1);
}
