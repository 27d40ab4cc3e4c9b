//! Configuration types for scan-indexer
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Database engine selection and connection settings
//! - Runtime configuration with validation

use crate::error::{ConfigError, ConfigResult};
use crate::types::ShareRecord;
use clap::Parser;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Smallest accepted index queue size
const MIN_BUFFER_SIZE: usize = 1;

/// Maximum flush worker threads
const MAX_FLUSH_WORKERS: usize = 64;

/// Scan local directories and index shares and files into a database
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scan-indexer",
    version,
    about = "Scan directories and index file metadata into a database",
    long_about = "Walks local directory trees and records every file (and any shares given\n\
                  with --share) in a relational database. Records are buffered in memory\n\
                  and written in batched transactions on background threads.",
    after_help = "EXAMPLES:\n    \
        scan-indexer /srv/data --db-catalog index.db\n    \
        scan-indexer /srv/data --share '\\\\fs01\\Finance' --max-index-queue 5000\n    \
        scan-indexer /mnt/a /mnt/b --exclude '\\.snapshot' -v"
)]
pub struct CliArgs {
    /// Directories to scan
    #[arg(value_name = "ROOT", required = true)]
    pub roots: Vec<PathBuf>,

    /// Database engine (sqlite, postgres)
    #[arg(long, default_value = "sqlite", value_name = "ENGINE")]
    pub engine: String,

    /// Database host (server engines)
    #[arg(long, value_name = "HOST")]
    pub db_host: Option<String>,

    /// Database port (server engines)
    #[arg(long, value_name = "PORT")]
    pub db_port: Option<u16>,

    /// Database user name
    #[arg(long, value_name = "USER")]
    pub db_username: Option<String>,

    /// Database password
    #[arg(long, value_name = "PASSWORD", env = "SCAN_INDEXER_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database catalog (database name, or file path for sqlite)
    #[arg(long, default_value = "index.db", value_name = "CATALOG")]
    pub db_catalog: String,

    /// Connection / busy timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub db_timeout: u64,

    /// Pending records above which a flush is scheduled
    #[arg(long, default_value = "10000", value_name = "NUM")]
    pub max_index_queue: usize,

    /// Flush at least this often while scanning (0 disables)
    #[arg(long, default_value = "5000", value_name = "MS")]
    pub flush_interval_ms: u64,

    /// Background flush threads
    #[arg(long, default_value_t = default_flush_workers(), value_name = "NUM")]
    pub flush_workers: usize,

    /// Share to record, as a UNC path with optional comment: '\\HOST\Share[=comment]'
    #[arg(long = "share", value_name = "UNC", action = clap::ArgAction::Append)]
    pub shares: Vec<String>,

    /// Exclude paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_flush_workers() -> usize {
    num_cpus::get().clamp(1, 2)
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    /// SQLite file
    Sqlite,
    /// PostgreSQL server
    #[cfg(feature = "postgres")]
    Postgres,
}

impl DatabaseEngine {
    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Sqlite => "sqlite",
            #[cfg(feature = "postgres")]
            DatabaseEngine::Postgres => "postgres",
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DatabaseEngine::Sqlite),
            #[cfg(feature = "postgres")]
            "postgres" | "postgresql" => Ok(DatabaseEngine::Postgres),
            _ => Err(ConfigError::UnknownEngine(s.to_string())),
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters shared by all engines
///
/// Blank values are normalized to `None` so they never reach a connection
/// string.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub catalog: Option<String>,
    pub timeout: Option<Duration>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConnectionSettings {
    /// Build settings, dropping blank fields and a zero port
    pub fn new(
        host: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        catalog: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            host: non_blank(host),
            port: port.filter(|p| *p > 0),
            username: non_blank(username),
            // only an all-blank password is dropped; the value itself is kept as given
            password: password.filter(|p| !p.trim().is_empty()),
            catalog: non_blank(catalog),
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    /// Keyword/value connection string (`host=... port=... dbname=...`)
    ///
    /// Each segment is present only if its field is set.
    pub fn to_conninfo(&self) -> String {
        let mut parts = Vec::new();

        if let Some(host) = &self.host {
            parts.push(format!("host={}", quote_conninfo_value(host)));
            if let Some(port) = self.port {
                parts.push(format!("port={}", port));
            }
        }
        if let Some(user) = &self.username {
            parts.push(format!("user={}", quote_conninfo_value(user)));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={}", quote_conninfo_value(password)));
        }
        if let Some(catalog) = &self.catalog {
            parts.push(format!("dbname={}", quote_conninfo_value(catalog)));
        }
        if let Some(timeout) = self.timeout {
            parts.push(format!("connect_timeout={}", timeout.as_secs().max(1)));
        }

        parts.join(" ")
    }

    /// Where we are connecting, without credentials
    pub fn display_target(&self) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        let catalog = self.catalog.as_deref().unwrap_or("");
        match self.port {
            Some(port) => format!("{}:{}/{}", host, port, catalog),
            None => format!("{}/{}", host, catalog),
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("catalog", &self.catalog)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Quote a conninfo value if it is empty or contains spaces, quotes or backslashes
fn quote_conninfo_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');

    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Validated indexer configuration
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Engine identifier, resolved when the indexer is built
    pub engine: String,

    /// Connection parameters
    pub connection: ConnectionSettings,

    /// Queue size above which a flush is wanted
    pub max_buffer_size: usize,

    /// Number of background flush threads
    pub flush_workers: usize,
}

impl IndexConfig {
    /// Create a config for an SQLite database file
    pub fn sqlite(path: impl Into<String>, max_buffer_size: usize) -> Self {
        Self {
            engine: DatabaseEngine::Sqlite.as_str().to_string(),
            connection: ConnectionSettings::new(
                None,
                None,
                None,
                None,
                Some(path.into()),
                Some(Duration::from_secs(30)),
            ),
            max_buffer_size,
            flush_workers: 1,
        }
    }

    /// Check limits that don't depend on the engine
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize {
                size: self.max_buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }

        if self.flush_workers == 0 || self.flush_workers > MAX_FLUSH_WORKERS {
            return Err(ConfigError::InvalidFlushWorkers {
                count: self.flush_workers,
                max: MAX_FLUSH_WORKERS,
            });
        }

        Ok(())
    }
}

/// Validated runtime configuration for the CLI
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Roots to walk
    pub roots: Vec<PathBuf>,

    /// Indexer settings
    pub index: IndexConfig,

    /// Periodic flush interval while scanning
    pub flush_interval: Option<Duration>,

    /// Shares to record
    pub shares: Vec<ShareRecord>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ScanConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        for root in &args.roots {
            if !root.is_dir() {
                return Err(ConfigError::InvalidRoot {
                    path: root.clone(),
                    reason: "not a directory".to_string(),
                });
            }
        }

        // Fail early; the indexer resolves the engine again when it is built
        args.engine.parse::<DatabaseEngine>()?;

        let index = IndexConfig {
            engine: args.engine,
            connection: ConnectionSettings::new(
                args.db_host,
                args.db_port,
                args.db_username,
                args.db_password,
                Some(args.db_catalog),
                Some(Duration::from_secs(args.db_timeout)),
            ),
            max_buffer_size: args.max_index_queue,
            flush_workers: args.flush_workers,
        };
        index.validate()?;

        let shares = args
            .shares
            .iter()
            .map(|s| parse_share_arg(s))
            .collect::<ConfigResult<Vec<_>>>()?;

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            roots: args.roots,
            index,
            flush_interval: Some(Duration::from_millis(args.flush_interval_ms))
                .filter(|d| !d.is_zero()),
            shares,
            exclude_patterns,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }
}

/// Parse `\\HOST\Share[=comment]`
fn parse_share_arg(arg: &str) -> ConfigResult<ShareRecord> {
    let (unc, comment) = match arg.split_once('=') {
        Some((unc, comment)) => (unc, Some(comment.to_string()).filter(|c| !c.is_empty())),
        None => (arg, None),
    };
    ShareRecord::from_unc(unc.trim(), comment)
}
