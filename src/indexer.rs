//! Indexing façade
//!
//! [`DatabaseIndexer`] is what the scanner talks to. It picks the engine
//! from configuration, buffers records without blocking, and pushes flush
//! work onto a [`FlushExecutor`].
//!
//! Overflow policy: adding records never schedules work by itself. The
//! caller polls [`DatabaseIndexer::flush_if_needed`] (typically after each
//! batch of adds), and at most one polled flush is queued at a time. A
//! flush job keeps draining while the buffer is still over its threshold
//! when it finishes, so a burst that outpaces a single cycle is handled
//! without resubmitting.

use crate::config::{DatabaseEngine, IndexConfig};
use crate::db::{BufferedDatabase, IndexBackend, IndexStats, SqliteBackend};
use crate::error::{ConfigError, ConfigResult};
use crate::executor::FlushExecutor;
use crate::types::{FileRecord, ShareRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Busy timeout used when the configuration doesn't give one
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Producer-facing indexing API
pub struct DatabaseIndexer {
    database: Arc<BufferedDatabase>,
    executor: Arc<dyn FlushExecutor>,
    /// Set while a polled flush is queued or running
    flush_queued: Arc<AtomicBool>,
}

impl DatabaseIndexer {
    /// Build an indexer for the configured engine
    ///
    /// Unknown engines and missing required settings fail here; nothing is
    /// retried.
    pub fn new(config: &IndexConfig, executor: Arc<dyn FlushExecutor>) -> ConfigResult<Self> {
        config.validate()?;

        let engine: DatabaseEngine = config.engine.parse()?;
        let backend = build_backend(engine, config)?;

        debug!(engine = %engine, max_buffer_size = config.max_buffer_size, "Created database indexer");

        Ok(Self::with_backend(backend, config.max_buffer_size, executor))
    }

    /// Build an indexer around an already constructed backend
    pub fn with_backend(
        backend: Box<dyn IndexBackend>,
        max_buffer_size: usize,
        executor: Arc<dyn FlushExecutor>,
    ) -> Self {
        Self {
            database: Arc::new(BufferedDatabase::new(backend, max_buffer_size)),
            executor,
            flush_queued: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check connectivity and create the schema
    ///
    /// Callers should not start scanning if this returns `false`.
    pub fn setup_connection(&self) -> bool {
        self.database.setup_connection()
    }

    /// Add a share for indexing
    pub fn add_share(&self, share: ShareRecord) {
        self.database.add_share(share);
    }

    /// Add a file for indexing
    pub fn add_file(&self, file: FileRecord) {
        self.database.add_file(file);
    }

    /// Pending record count
    pub fn queue_size(&self) -> usize {
        self.database.queue_size()
    }

    /// True when more records are pending than the configured maximum
    pub fn needs_flush(&self) -> bool {
        self.database.needs_flush()
    }

    /// Engine in use
    pub fn engine(&self) -> &'static str {
        self.database.engine()
    }

    /// Indexing statistics
    pub fn stats(&self) -> &IndexStats {
        self.database.stats()
    }

    /// Schedule a flush on the executor
    pub fn flush(&self) {
        debug!("Flushing database");
        self.submit_flush(false);
    }

    /// Schedule a flush if the buffer is over its threshold and none is queued
    ///
    /// Returns true if a flush was scheduled.
    pub fn flush_if_needed(&self) -> bool {
        if !self.database.needs_flush() {
            return false;
        }

        debug!(queue_size = self.queue_size(), "Index queue over threshold, flushing");
        self.submit_coalesced()
    }

    /// Schedule a flush if anything is pending and no polled flush is queued
    ///
    /// For periodic flushing: a slow database gets at most one outstanding
    /// job, not one per tick.
    pub fn flush_pending(&self) -> bool {
        if self.database.queue_size() == 0 {
            return false;
        }

        self.submit_coalesced()
    }

    /// Flush on the calling thread and wait for it to finish
    ///
    /// Use this at shutdown: the indexer does not drain itself on drop.
    pub fn flush_sync(&self) {
        debug!("Flushing database sync");
        run_flush(&self.database);
    }

    fn submit_coalesced(&self) -> bool {
        if self
            .flush_queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.submit_flush(true);
        true
    }

    fn submit_flush(&self, clears_queued: bool) {
        let database = Arc::clone(&self.database);
        let flush_queued = Arc::clone(&self.flush_queued);

        let job = Box::new(move || {
            while run_flush(&database) && database.needs_flush() {
                debug!(
                    queue_size = database.queue_size(),
                    "Index queue still over threshold, flushing again"
                );
            }
            if clears_queued {
                flush_queued.store(false, Ordering::Release);
            }
        });

        if let Err(e) = self.executor.submit(job) {
            error!("Could not schedule database flush: {}", e);
            self.database.stats().record_failed_flush();
            if clears_queued {
                self.flush_queued.store(false, Ordering::Release);
            }
        }
    }
}

/// One guarded flush; returns false if it failed
fn run_flush(database: &BufferedDatabase) -> bool {
    match database.flush() {
        Ok(()) => true,
        Err(e) => {
            error!("Database flush failed: {}", e);
            false
        }
    }
}

fn build_backend(engine: DatabaseEngine, config: &IndexConfig) -> ConfigResult<Box<dyn IndexBackend>> {
    let settings = &config.connection;

    match engine {
        DatabaseEngine::Sqlite => {
            let path = settings.catalog.as_ref().ok_or_else(|| ConfigError::MissingCatalog {
                engine: engine.to_string(),
            })?;
            let timeout = settings.timeout.unwrap_or(DEFAULT_TIMEOUT);
            Ok(Box::new(SqliteBackend::new(path, timeout)))
        }
        #[cfg(feature = "postgres")]
        DatabaseEngine::Postgres => {
            if settings.catalog.is_none() {
                return Err(ConfigError::MissingCatalog {
                    engine: engine.to_string(),
                });
            }
            Ok(Box::new(crate::db::PostgresBackend::new(
                settings.to_conninfo(),
                settings.display_target(),
            )))
        }
    }
}
