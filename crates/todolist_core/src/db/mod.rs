//! SQLite connection factory and schema migration entry points.
//!
//! # Responsibility
//! - Build the pooled connection factory shared by store operations.
//! - Apply schema migrations in deterministic order before first use.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No item data is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_pool, open_pool_in_memory, ConnectionPool, PooledConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Pool construction failed or no connection became free in time.
    Pool(r2d2::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Pool(err) => write!(f, "connection pool error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(value: r2d2::Error) -> Self {
        Self::Pool(value)
    }
}
