//! Database schema definitions and creation
//!
//! Tables are created with `IF NOT EXISTS` so setup can run against a store
//! that was bootstrapped by an earlier run. No indexes are created here:
//! building them while rows are still streaming in slows inserts down.

use crate::error::DbResult;
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the shares table
pub const CREATE_SHARES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shares (
    id INTEGER PRIMARY KEY,
    computer TEXT NOT NULL,
    sharename TEXT NOT NULL,
    comment TEXT
)
"#;

/// SQL to create the files table
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    fullname TEXT NOT NULL,
    filename TEXT NOT NULL,
    size INTEGER,
    extension TEXT
)
"#;

/// SQL to create index metadata table
const CREATE_INDEX_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS index_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// Parameterized share insert
pub const INSERT_SHARE: &str =
    "INSERT INTO shares (computer, sharename, comment) VALUES (?1, ?2, ?3)";

/// Parameterized file insert
pub const INSERT_FILE: &str =
    "INSERT INTO files (fullname, filename, size, extension) VALUES (?1, ?2, ?3, ?4)";

/// Journal settings; WAL is persistent in the file so it only needs setting once
const SETUP_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

/// Create tables and record schema metadata
pub fn create_database(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(SETUP_PRAGMAS)?;

    conn.execute(CREATE_SHARES_TABLE, [])?;
    conn.execute(CREATE_FILES_TABLE, [])?;
    conn.execute(CREATE_INDEX_INFO_TABLE, [])?;

    set_index_info(conn, keys::SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
    set_index_info(conn, keys::INDEXER_VERSION, env!("CARGO_PKG_VERSION"))?;

    Ok(())
}

/// Store index metadata
pub fn set_index_info(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get index metadata
pub fn get_index_info(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM index_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys
pub mod keys {
    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Indexer version
    pub const INDEXER_VERSION: &str = "indexer_version";
}
