//! Pending record buffer
//!
//! Holds shares and files waiting to be written. Each kind sits in its own
//! unbounded crossbeam channel, which gives us a lock-free multi-producer
//! queue with a thread-safe pop-one-or-none (`try_recv`). Ordering is not
//! meaningful here; the channel is only used as a concurrent bag.

use crate::types::{FileRecord, ShareRecord};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// In-memory holding area for records awaiting commit
pub struct PendingBuffer {
    share_tx: Sender<ShareRecord>,
    share_rx: Receiver<ShareRecord>,
    file_tx: Sender<FileRecord>,
    file_rx: Receiver<FileRecord>,

    /// Queue size above which a flush is wanted
    max_buffer_size: usize,
}

impl PendingBuffer {
    /// Create an empty buffer with the given flush threshold
    pub fn new(max_buffer_size: usize) -> Self {
        let (share_tx, share_rx) = unbounded();
        let (file_tx, file_rx) = unbounded();

        Self {
            share_tx,
            share_rx,
            file_tx,
            file_rx,
            max_buffer_size,
        }
    }

    /// Queue a share
    pub fn add_share(&self, share: ShareRecord) {
        // Both ends live in `self`, so the channel can't be disconnected here.
        let _ = self.share_tx.send(share);
    }

    /// Queue a file
    pub fn add_file(&self, file: FileRecord) {
        let _ = self.file_tx.send(file);
    }

    /// Pop one share, if any are pending
    pub fn take_share(&self) -> Option<ShareRecord> {
        self.share_rx.try_recv().ok()
    }

    /// Pop one file, if any are pending
    pub fn take_file(&self) -> Option<FileRecord> {
        self.file_rx.try_recv().ok()
    }

    /// Number of pending shares
    pub fn share_count(&self) -> usize {
        self.share_rx.len()
    }

    /// Number of pending files
    pub fn file_count(&self) -> usize {
        self.file_rx.len()
    }

    /// Total pending records (snapshot)
    pub fn queue_size(&self) -> usize {
        self.share_count() + self.file_count()
    }

    /// Configured flush threshold
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// True once the queue holds strictly more than the threshold
    pub fn needs_flush(&self) -> bool {
        self.queue_size() > self.max_buffer_size
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.share_rx.is_empty() && self.file_rx.is_empty()
    }
}
