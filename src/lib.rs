//! scan-indexer - Write-back buffered indexing of scan results
//!
//! Decouples a fast producer of discovery records (network shares and files
//! found by a scanner) from a transactional database. Producers add records
//! to an in-memory buffer and never wait on the database; background flush
//! jobs drain the buffer in batched, all-or-nothing transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Scanner threads                             │
//! │            add_share() / add_file() - never block               │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    DatabaseIndexer                              │
//! │  ┌──────────────────────┐        ┌──────────────────────────┐   │
//! │  │    PendingBuffer     │        │     FlushExecutor        │   │
//! │  │  shares │ files      │──────▶ │  db-flush-0 .. N         │   │
//! │  │  needs_flush()       │ flush  │  (crossbeam channel)     │   │
//! │  └──────────────────────┘        └────────────┬─────────────┘   │
//! └───────────────────────────────────────────────┼─────────────────┘
//!                                                 │
//!                                                 ▼
//!                                  ┌──────────────────────────┐
//!                                  │      IndexBackend        │
//!                                  │  1 tx per table / flush  │
//!                                  │  rollback on failure     │
//!                                  └────────────┬─────────────┘
//!                                               ▼
//!                                  ┌──────────────────────────┐
//!                                  │  SQLite / PostgreSQL     │
//!                                  └──────────────────────────┘
//! ```
//!
//! Records are popped from the buffer before they are written. If a batch
//! fails, it is rolled back and its records are dropped (and counted), not
//! re-queued. Call [`DatabaseIndexer::flush_sync`] before exiting; the
//! indexer does not drain itself on drop.
//!
//! # Example
//!
//! ```no_run
//! use scan_indexer::{BackgroundExecutor, DatabaseIndexer, FileRecord, IndexConfig};
//! use std::sync::Arc;
//!
//! let executor = Arc::new(BackgroundExecutor::new(1).unwrap());
//! let indexer = DatabaseIndexer::new(&IndexConfig::sqlite("index.db", 10_000), executor.clone()).unwrap();
//! assert!(indexer.setup_connection());
//!
//! indexer.add_file(FileRecord::new("/data/a.txt", "a.txt", Some(12), Some(".txt".into())));
//! indexer.flush_if_needed();
//!
//! executor.shutdown().unwrap();
//! indexer.flush_sync();
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod indexer;
pub mod progress;
pub mod scan;
pub mod types;

pub use config::{CliArgs, ConnectionSettings, DatabaseEngine, IndexConfig, ScanConfig};
pub use error::{ConfigError, DbError, WorkerError};
pub use executor::{BackgroundExecutor, FlushExecutor, InlineExecutor};
pub use indexer::DatabaseIndexer;
pub use types::{FileRecord, ShareRecord};
