//! PostgreSQL engine adapter
//!
//! Same protocol as the SQLite adapter: one blocking client per flush, one
//! transaction per table, one prepared statement reused for every row.

use crate::db::backend::IndexBackend;
use crate::db::buffer::PendingBuffer;
use crate::db::stats::IndexStats;
use crate::error::{DbError, DbResult};
use postgres::{Client, NoTls, Transaction};
use tracing::{debug, error, warn};

const CREATE_SHARES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shares (
    id BIGSERIAL PRIMARY KEY,
    computer TEXT NOT NULL,
    sharename TEXT NOT NULL,
    comment TEXT
)
"#;

const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id BIGSERIAL PRIMARY KEY,
    fullname TEXT NOT NULL,
    filename TEXT NOT NULL,
    size BIGINT,
    extension TEXT
)
"#;

const INSERT_SHARE: &str = "INSERT INTO shares (computer, sharename, comment) VALUES ($1, $2, $3)";

const INSERT_FILE: &str =
    "INSERT INTO files (fullname, filename, size, extension) VALUES ($1, $2, $3, $4)";

/// PostgreSQL backend
pub struct PostgresBackend {
    conninfo: String,
    /// Host shown in logs (the conninfo may carry a password)
    display_target: String,
}

impl PostgresBackend {
    /// Create a backend from a keyword/value connection string
    pub fn new(conninfo: impl Into<String>, display_target: impl Into<String>) -> Self {
        Self {
            conninfo: conninfo.into(),
            display_target: display_target.into(),
        }
    }

    fn connect(&self) -> DbResult<Client> {
        debug!("Connecting to {}", self.display_target);

        Client::connect(&self.conninfo, NoTls).map_err(|e| DbError::ConnectFailed {
            target: self.display_target.clone(),
            reason: e.to_string(),
        })
    }

    fn finish_batch(
        &self,
        table: &str,
        tx: Transaction<'_>,
        popped: u64,
        outcome: DbResult<u64>,
        stats: &IndexStats,
    ) -> Option<u64> {
        match outcome {
            Ok(rows) => match tx.commit() {
                Ok(()) => {
                    if popped > 0 {
                        debug!(table, rows, "Committed transaction");
                    }
                    Some(rows)
                }
                Err(e) => {
                    error!(table, "Could not commit {} batch: {}", table, e);
                    stats.record_rollback(popped);
                    None
                }
            },
            Err(e) => {
                error!(
                    table,
                    dropped = popped,
                    "Could not insert {} into database, rolling back transaction: {}",
                    table,
                    e
                );
                if let Err(rollback_err) = tx.rollback() {
                    error!(table, "Could not roll back transaction: {}", rollback_err);
                }
                stats.record_rollback(popped);
                None
            }
        }
    }
}

impl IndexBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn setup(&self) -> DbResult<()> {
        let mut client = self.connect()?;
        client
            .batch_execute(CREATE_SHARES_TABLE)
            .map_err(|e| DbError::Schema(e.to_string()))?;
        client
            .batch_execute(CREATE_FILES_TABLE)
            .map_err(|e| DbError::Schema(e.to_string()))?;
        Ok(())
    }

    fn insert_shares(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64> {
        let mut client = self.connect()?;
        let mut tx = client.transaction()?;

        let mut popped = 0u64;
        let outcome = write_shares(&mut tx, buffer, stats, &mut popped);

        match self.finish_batch("shares", tx, popped, outcome, stats) {
            Some(rows) if popped > 0 => {
                stats.record_share_commit(rows);
                Ok(rows)
            }
            _ => Ok(0),
        }
    }

    fn insert_files(&self, buffer: &PendingBuffer, stats: &IndexStats) -> DbResult<u64> {
        let mut client = self.connect()?;
        let mut tx = client.transaction()?;

        let mut popped = 0u64;
        let mut bytes = 0u64;
        let outcome = write_files(&mut tx, buffer, &mut popped, &mut bytes);

        match self.finish_batch("files", tx, popped, outcome, stats) {
            Some(rows) if popped > 0 => {
                stats.record_file_commit(rows, bytes);
                Ok(rows)
            }
            _ => Ok(0),
        }
    }
}

fn write_shares(
    tx: &mut Transaction<'_>,
    buffer: &PendingBuffer,
    stats: &IndexStats,
    popped: &mut u64,
) -> DbResult<u64> {
    let stmt = tx.prepare(INSERT_SHARE)?;
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

        tx.execute(&stmt, &[&share.computer, &share_name, &share.comment])?;
        rows += 1;
    }

    Ok(rows)
}

fn write_files(
    tx: &mut Transaction<'_>,
    buffer: &PendingBuffer,
    popped: &mut u64,
    bytes: &mut u64,
) -> DbResult<u64> {
    let stmt = tx.prepare(INSERT_FILE)?;
    let mut rows = 0u64;

    while let Some(file) = buffer.take_file() {
        *popped += 1;

        tx.execute(&stmt, &[&file.full_path, &file.name, &file.size, &file.extension])?;
        rows += 1;
        *bytes += file.size.map(|s| s.max(0) as u64).unwrap_or(0);
    }

    Ok(rows)
}
