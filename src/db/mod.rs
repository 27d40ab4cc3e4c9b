//! Database module: buffering, engine adapters and schema
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Producer Threads (N)                    │
//! │  - add_share / add_file, never block                 │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 PendingBuffer                        │
//! │  - shares / files (crossbeam unbounded)              │
//! │  - needs_flush() when size > max                     │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ flush (background thread)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                  IndexBackend                        │
//! │  - one transaction per table per flush               │
//! │  - rollback on any row failure                       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │            SQLite file / PostgreSQL server           │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod buffer;
pub mod schema;
pub mod sqlite;
pub mod stats;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use backend::{BufferedDatabase, IndexBackend};
pub use buffer::PendingBuffer;
pub use sqlite::SqliteBackend;
pub use stats::{IndexStats, IndexStatsSnapshot};

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresBackend;
