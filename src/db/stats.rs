//! Indexing statistics
//!
//! Counters are updated by the engine adapters from whatever thread runs the
//! flush, and read by the CLI for progress and the final summary.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one indexer
#[derive(Debug, Default)]
pub struct IndexStats {
    /// Share rows committed
    pub shares_written: AtomicU64,

    /// File rows committed
    pub files_written: AtomicU64,

    /// Sum of committed file sizes
    pub bytes_indexed: AtomicU64,

    /// Transactions committed
    pub batches_committed: AtomicU64,

    /// Transactions rolled back
    pub batches_rolled_back: AtomicU64,

    /// Records popped into a batch that was rolled back
    pub records_dropped: AtomicU64,

    /// Shares skipped because their path did not match their computer
    pub shares_rejected: AtomicU64,

    /// Flush cycles that ended in an error
    pub flushes_failed: AtomicU64,
}

/// Plain copy of [`IndexStats`] at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStatsSnapshot {
    pub shares_written: u64,
    pub files_written: u64,
    pub bytes_indexed: u64,
    pub batches_committed: u64,
    pub batches_rolled_back: u64,
    pub records_dropped: u64,
    pub shares_rejected: u64,
    pub flushes_failed: u64,
}

impl IndexStats {
    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> IndexStatsSnapshot {
        IndexStatsSnapshot {
            shares_written: self.shares_written.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            bytes_indexed: self.bytes_indexed.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_rolled_back: self.batches_rolled_back.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            shares_rejected: self.shares_rejected.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
        }
    }

    /// Record a committed share batch
    pub(crate) fn record_share_commit(&self, rows: u64) {
        self.shares_written.fetch_add(rows, Ordering::Relaxed);
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed file batch
    pub(crate) fn record_file_commit(&self, rows: u64, bytes: u64) {
        self.files_written.fetch_add(rows, Ordering::Relaxed);
        self.bytes_indexed.fetch_add(bytes, Ordering::Relaxed);
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rolled back batch and the records it took with it
    pub(crate) fn record_rollback(&self, dropped: u64) {
        self.batches_rolled_back.fetch_add(1, Ordering::Relaxed);
        self.records_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_share(&self) {
        self.shares_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_flush(&self) {
        self.flushes_failed.fetch_add(1, Ordering::Relaxed);
    }
}

impl IndexStatsSnapshot {
    /// Total rows committed across both tables
    pub fn rows_written(&self) -> u64 {
        self.shares_written + self.files_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_updates() {
        let stats = IndexStats::default();
        stats.record_share_commit(3);
        stats.record_file_commit(5, 4096);
        stats.record_rollback(7);
        stats.record_rejected_share();

        let snap = stats.snapshot();
        assert_eq!(snap.shares_written, 3);
        assert_eq!(snap.files_written, 5);
        assert_eq!(snap.bytes_indexed, 4096);
        assert_eq!(snap.batches_committed, 2);
        assert_eq!(snap.batches_rolled_back, 1);
        assert_eq!(snap.records_dropped, 7);
        assert_eq!(snap.shares_rejected, 1);
        assert_eq!(snap.rows_written(), 8);
    }
}
