//! Engine adapter trait and the buffered database built on top of it
//!
//! An [`IndexBackend`] knows how to talk to one database engine: bootstrap
//! the schema, and drain a [`PendingBuffer`] into a single transaction per
//! table. [`BufferedDatabase`] pairs one backend with the buffer and the
//! flush policy.

use crate::db::buffer::PendingBuffer;
use crate::db::stats::IndexStats;
use crate::error::DbResult;
use crate::types::{FileRecord, ShareRecord};
use tracing::{debug, error, info};

/// Capabilities every database engine provides
///
/// Insert methods pop records from the buffer before writing them. A failure
/// after the first pop is handled inside the adapter (rollback, logging,
/// stats) and still returns `Ok`; `Err` means the batch never started, so
/// nothing was taken from the buffer.
pub trait IndexBackend: Send + Sync {
    /// Engine name for log messages
    fn name(&self) -> &'static str;

    /// Check connectivity and create tables if they are missing
    fn setup(&self) -> DbResult<()>;

    /// Drain pending shares into one transaction, returning rows committed
    fn insert_shares(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64>;

    /// Drain pending files into one transaction, returning rows committed
    fn insert_files(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64>;
}

/// Pending buffer plus the engine that flushes it
pub struct BufferedDatabase {
    buffer: PendingBuffer,
    backend: Box<dyn IndexBackend>,
    stats: IndexStats,
}

impl BufferedDatabase {
    /// Wrap a backend with a buffer that wants flushing above `max_buffer_size`
    pub fn new(backend: Box<dyn IndexBackend>, max_buffer_size: usize) -> Self {
        Self {
            buffer: PendingBuffer::new(max_buffer_size),
            backend,
            stats: IndexStats::default(),
        }
    }

    /// Queue a share for indexing
    pub fn add_share(&self, share: ShareRecord) {
        self.buffer.add_share(share);
    }

    /// Queue a file for indexing
    pub fn add_file(&self, file: FileRecord) {
        self.buffer.add_file(file);
    }

    /// Pending record count
    pub fn queue_size(&self) -> usize {
        self.buffer.queue_size()
    }

    /// Flush threshold
    pub fn max_buffer_size(&self) -> usize {
        self.buffer.max_buffer_size()
    }

    /// True when more than `max_buffer_size` records are pending
    pub fn needs_flush(&self) -> bool {
        self.buffer.needs_flush()
    }

    /// Engine name
    pub fn engine(&self) -> &'static str {
        self.backend.name()
    }

    /// Indexing statistics
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Validate the connection and bootstrap the schema
    pub fn setup_connection(&self) -> bool {
        debug!(engine = self.backend.name(), "Setting up database connection");

        match self.backend.setup() {
            Ok(()) => {
                info!(engine = self.backend.name(), "Database connection ready");
                true
            }
            Err(e) => {
                error!(engine = self.backend.name(), "Could not set up database: {}", e);
                false
            }
        }
    }

    /// Write everything currently pending, shares first then files
    ///
    /// Both tables are attempted even if the first one fails; the first
    /// error is returned.
    pub fn flush(&self) -> DbResult<()> {
        let shares = self.backend.insert_shares(&self.buffer, &self.stats);
        let files = self.backend.insert_files(&self.buffer, &self.stats);

        match (shares, files) {
            (Ok(s), Ok(f)) => {
                if s + f > 0 {
                    debug!(shares = s, files = f, "Flush complete");
                }
                Ok(())
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => {
                self.stats.record_failed_flush();
                Err(e)
            }
            (Err(share_err), Err(file_err)) => {
                self.stats.record_failed_flush();
                error!("File insert also failed: {}", file_err);
                Err(share_err)
            }
        }
    }
}
