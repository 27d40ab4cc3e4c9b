//! Error types for scan-indexer
//!
//! This module defines the error hierarchy for:
//! - Database engine errors (connect, schema, batch inserts)
//! - Configuration and CLI errors
//! - Flush executor errors
//!
//! Library code returns these structured errors; the indexing façade turns
//! every failure that reaches it into a log report so nothing escapes into
//! the producer path.

use std::path::PathBuf;
use thiserror::Error;

/// Database engine errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Could not open a connection to the store
    #[error("Failed to connect to '{target}': {reason}")]
    ConnectFailed { target: String, reason: String },

    /// Schema bootstrap error
    #[error("Database schema error: {0}")]
    Schema(String),

    /// Share path does not start with `\\<computer>\`
    #[error("Share path '{path}' does not start with '\\\\{computer}\\'")]
    InvalidSharePath { computer: String, path: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Engine identifier not recognized (or not compiled in)
    #[error("Unknown database engine '{0}'")]
    UnknownEngine(String),

    /// Engine needs a catalog (database name or file) and none was given
    #[error("Database engine '{engine}' requires a catalog")]
    MissingCatalog { engine: String },

    /// Invalid buffer size
    #[error("Invalid index queue size {size}: must be at least {min}")]
    InvalidBufferSize { size: usize, min: usize },

    /// Invalid flush worker count
    #[error("Invalid flush worker count {count}: must be between 1 and {max}")]
    InvalidFlushWorkers { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Share argument is not a UNC path
    #[error("Invalid share '{share}': {reason}")]
    InvalidShare { share: String, reason: String },

    /// Scan root error
    #[error("Invalid scan root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },
}

/// Flush executor errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Failed to spawn a flush thread
    #[error("Failed to spawn flush worker '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// Job queue has been shut down
    #[error("Flush queue closed: executor has shut down")]
    QueueClosed,

    /// Flush thread panicked outside of a job
    #[error("Flush worker '{name}' panicked")]
    Panicked { name: String },
}

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
