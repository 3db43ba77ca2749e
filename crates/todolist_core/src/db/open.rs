//! Pooled connection factory for SQLite.
//!
//! # Responsibility
//! - Build an `r2d2` pool over file or in-memory SQLite databases.
//! - Configure every new connection with the pragmas core relies on.
//! - Apply schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON` and a busy timeout.
//! - In-memory pools hold exactly one connection that is never recycled,
//!   validated or replaced, since each SQLite memory connection is its own
//!   database and a replacement would start empty and unmigrated.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::DatabaseConfig;
use log::{error, info};
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Connection factory handed out by [`open_pool`].
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// One checked-out connection; returns to the pool on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Debug)]
struct ConnectionPragmas {
    busy_timeout: Duration,
}

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(self.busy_timeout)
    }
}

/// Builds the connection pool described by `config` and migrates the schema.
///
/// # Side effects
/// - Creates the database file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_pool(config: &DatabaseConfig) -> DbResult<ConnectionPool> {
    let started_at = Instant::now();
    let mode = if config.is_in_memory() { "memory" } else { "file" };
    info!("event=db_open module=db status=start mode={mode}");

    match build_pool(config) {
        Ok(pool) => {
            info!(
                "event=db_open module=db status=ok mode={} pool_size={} duration_ms={}",
                mode,
                pool.max_size(),
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens a private in-memory database with default settings.
pub fn open_pool_in_memory() -> DbResult<ConnectionPool> {
    open_pool(&DatabaseConfig::in_memory())
}

fn build_pool(config: &DatabaseConfig) -> DbResult<ConnectionPool> {
    let pragmas = ConnectionPragmas {
        busy_timeout: Duration::from_millis(config.busy_timeout_ms),
    };
    let builder = Pool::builder()
        .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
        .connection_customizer(Box::new(pragmas));

    let pool = if config.is_in_memory() {
        builder
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .test_on_check_out(false)
            .build(SqliteConnectionManager::memory())?
    } else {
        builder
            .max_size(config.pool_size)
            .build(SqliteConnectionManager::file(&config.path))?
    };

    let mut conn = pool.get()?;
    apply_migrations(&mut conn)?;
    drop(conn);

    Ok(pool)
}
