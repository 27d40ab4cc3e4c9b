//! Local directory scanner
//!
//! A small producer for the CLI: walks directory trees depth-first and
//! hands every regular file to the indexer. Unreadable directories are
//! logged and skipped.

use crate::indexer::DatabaseIndexer;
use crate::types::FileRecord;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Counters for one scan
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Directories read
    pub dirs: u64,
    /// Files handed to the indexer
    pub files: u64,
    /// Sum of file sizes
    pub bytes: u64,
    /// Directories or entries that could not be read
    pub errors: u64,
    /// Scan ended early because of a shutdown request
    pub interrupted: bool,
}

/// Walks local roots and feeds the indexer
pub struct LocalScanner<'a> {
    indexer: &'a DatabaseIndexer,
    exclude: &'a [Regex],
    flush_interval: Option<Duration>,
    shutdown: &'a AtomicBool,
    last_flush: Instant,
}

impl<'a> LocalScanner<'a> {
    /// Create a scanner
    pub fn new(
        indexer: &'a DatabaseIndexer,
        exclude: &'a [Regex],
        flush_interval: Option<Duration>,
        shutdown: &'a AtomicBool,
    ) -> Self {
        Self {
            indexer,
            exclude,
            flush_interval,
            shutdown,
            last_flush: Instant::now(),
        }
    }

    /// Walk one root
    pub fn scan(&mut self, root: &Path, stats: &mut ScanStats) {
        let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            if self.shutdown.load(Ordering::SeqCst) {
                stats.interrupted = true;
                return;
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to read directory {}: {}", dir.display(), e);
                    stats.errors += 1;
                    continue;
                }
            };
            stats.dirs += 1;

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Bad entry in {}: {}", dir.display(), e);
                        stats.errors += 1;
                        continue;
                    }
                };

                let path = entry.path();
                if self.is_excluded(&path) {
                    continue;
                }

                let file_type = match entry.file_type() {
                    Ok(ft) => ft,
                    Err(e) => {
                        debug!("Failed to stat {}: {}", path.display(), e);
                        stats.errors += 1;
                        continue;
                    }
                };

                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file() {
                    let size = entry.metadata().ok().map(|m| m.len());
                    stats.files += 1;
                    stats.bytes += size.unwrap_or(0);
                    self.indexer.add_file(FileRecord::from_path(&path, size));
                    self.maybe_flush();
                }
            }
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.exclude.iter().any(|re| re.is_match(&path))
    }

    fn maybe_flush(&mut self) {
        if self.indexer.flush_if_needed() {
            self.last_flush = Instant::now();
            return;
        }

        if let Some(interval) = self.flush_interval {
            if self.last_flush.elapsed() >= interval {
                self.indexer.flush_pending();
                self.last_flush = Instant::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::error::WorkerError;
    use crate::executor::{FlushExecutor, InlineExecutor, Job};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Accepts jobs and never runs them, like a database that hangs
    #[derive(Default)]
    struct StalledExecutor {
        submitted: AtomicUsize,
    }

    impl FlushExecutor for StalledExecutor {
        fn submit(&self, _job: Job) -> Result<(), WorkerError> {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join(".snapshot")).unwrap();
        fs::write(root.join("top.txt"), b"hello").unwrap();
        fs::write(root.join("a/one.csv"), b"1,2,3").unwrap();
        fs::write(root.join("a/b/two"), b"").unwrap();
        fs::write(root.join(".snapshot/old.txt"), b"old").unwrap();
    }

    #[test]
    fn test_scan_feeds_indexer() {
        let data = tempdir().unwrap();
        make_tree(data.path());

        let out = tempdir().unwrap();
        let db_path = out.path().join("index.db");
        let config = IndexConfig::sqlite(db_path.to_string_lossy(), 1000);
        let indexer = DatabaseIndexer::new(&config, Arc::new(InlineExecutor)).unwrap();

        let exclude = vec![Regex::new(r"\.snapshot").unwrap()];
        let shutdown = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        LocalScanner::new(&indexer, &exclude, None, &shutdown).scan(data.path(), &mut stats);

        assert_eq!(stats.files, 3);
        assert_eq!(stats.dirs, 3);
        assert_eq!(stats.bytes, 10);
        assert_eq!(indexer.queue_size(), 3);
    }

    #[test]
    fn test_interval_flush_does_not_pile_up() {
        let data = tempdir().unwrap();
        make_tree(data.path());

        let executor = Arc::new(StalledExecutor::default());
        let config = IndexConfig::sqlite("unused.db", 1000);
        let indexer = DatabaseIndexer::new(&config, executor.clone()).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        // every file is past the interval, but the first job never finishes
        LocalScanner::new(&indexer, &[], Some(Duration::ZERO), &shutdown)
            .scan(data.path(), &mut stats);

        assert_eq!(stats.files, 4);
        assert_eq!(executor.submitted.load(Ordering::SeqCst), 1);
        assert_eq!(indexer.queue_size(), 4);
    }

    #[test]
    fn test_scan_stops_on_shutdown() {
        let data = tempdir().unwrap();
        make_tree(data.path());

        let config = IndexConfig::sqlite("unused.db", 1000);
        let indexer = DatabaseIndexer::new(&config, Arc::new(InlineExecutor)).unwrap();
        let shutdown = AtomicBool::new(true);
        let mut stats = ScanStats::default();

        LocalScanner::new(&indexer, &[], None, &shutdown).scan(data.path(), &mut stats);

        assert!(stats.interrupted);
        assert_eq!(stats.files, 0);
    }
}
