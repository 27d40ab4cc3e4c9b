//! SQLite engine adapter
//!
//! Every flush opens its own connection, starts one transaction per table
//! and reuses one prepared insert for the whole batch. Records are popped
//! from the buffer before they are written, so a batch that rolls back
//! takes its records with it; they are counted as dropped, not re-queued.

use crate::db::backend::IndexBackend;
use crate::db::buffer::PendingBuffer;
use crate::db::schema;
use crate::db::stats::IndexStats;
use crate::error::{DbError, DbResult};
use rusqlite::{params, Connection, Transaction};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Outcome of draining one buffer inside a transaction
struct Drained {
    /// Records taken from the buffer
    popped: u64,
    /// Rows written
    rows: u64,
    /// Sum of written file sizes
    bytes: u64,
}

/// SQLite backend writing to a single database file
pub struct SqliteBackend {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteBackend {
    /// Create a backend for the database at `path`
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    fn open(&self) -> DbResult<Connection> {
        debug!("Opening database: {}", self.path.display());

        let conn = Connection::open(&self.path).map_err(|e| DbError::ConnectFailed {
            target: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Commit on success, roll back on failure; logs either way
    fn finish_batch(
        &self,
        table: &str,
        tx: Transaction<'_>,
        popped: u64,
        outcome: DbResult<Drained>,
        stats: &IndexStats,
    ) -> Option<Drained> {
        let failure = match outcome {
            Ok(drained) => match tx.commit() {
                Ok(()) => {
                    if drained.popped > 0 {
                        debug!(table, rows = drained.rows, "Committed transaction");
                    }
                    return Some(drained);
                }
                // a failed commit rolls the transaction back when it drops
                Err(e) => {
                    error!(table, "Could not commit {} batch: {}", table, e);
                    stats.record_rollback(popped);
                    return None;
                }
            },
            Err(e) => e,
        };

        error!(
            table,
            dropped = popped,
            "Could not insert {} into database, rolling back transaction: {}",
            table,
            failure
        );

        if let Err(rollback_err) = tx.rollback() {
            error!(table, "Could not roll back transaction: {}", rollback_err);
        }

        stats.record_rollback(popped);
        None
    }
}

impl IndexBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn setup(&self) -> DbResult<()> {
        let conn = self.open()?;
        schema::create_database(&conn).map_err(|e| DbError::Schema(e.to_string()))?;
        debug!("Schema ready in {}", self.path.display());
        Ok(())
    }

    fn insert_shares(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        let mut popped = 0u64;
        let outcome = write_shares(&tx, buffer, stats, &mut popped);

        let rows = match self.finish_batch("shares", tx, popped, outcome, stats) {
            Some(drained) => {
                if drained.popped > 0 {
                    stats.record_share_commit(drained.rows);
                }
                drained.rows
            }
            None => 0,
        };
        Ok(rows)
    }

    fn insert_files(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        let mut popped = 0u64;
        let outcome = write_files(&tx, buffer, &mut popped);

        let rows = match self.finish_batch("files", tx, popped, outcome, stats) {
            Some(drained) => {
                if drained.popped > 0 {
                    stats.record_file_commit(drained.rows, drained.bytes);
                }
                drained.rows
            }
            None => 0,
        };
        Ok(rows)
    }
}

fn write_shares(
    tx: &Transaction<'_>,
    buffer: &PendingBuffer,
    stats: &IndexStats,
    popped: &mut u64,
) -> DbResult<Drained> {
    let mut stmt = tx.prepare(schema::INSERT_SHARE)?;
    let mut rows = 0u64;

    while let Some(share) = buffer.take_share() {
        let share_name = match share.share_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping share: {}", e);
                stats.record_rejected_share();
                continue;
            }
        };

        // rejected shares are already counted and never join the batch
        *popped += 1;

        stmt.execute(params![share.computer, share_name, share.comment])?;
        rows += 1;
    }

    Ok(Drained {
        popped: *popped,
        rows,
        bytes: 0,
    })
}

fn write_files(tx: &Transaction<'_>, buffer: &PendingBuffer, popped: &mut u64) -> DbResult<Drained> {
    let mut stmt = tx.prepare(schema::INSERT_FILE)?;
    let mut rows = 0u64;
    let mut bytes = 0u64;

    while let Some(file) = buffer.take_file() {
        *popped += 1;

        stmt.execute(params![file.full_path, file.name, file.size, file.extension])?;
        rows += 1;
        bytes += file.size.map(|s| s.max(0) as u64).unwrap_or(0);
    }

    Ok(Drained {
        popped: *popped,
        rows,
        bytes,
    })
}
