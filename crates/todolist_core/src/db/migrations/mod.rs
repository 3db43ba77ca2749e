//! SQLite migration registry and executor.
//!
//! # Invariants
//! - `version` values are strictly increasing.
//! - All pending migrations run in one transaction; the applied version is
//!   mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_items.sql"),
    },
];

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies pending migrations and returns how many ran.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the database is newer than
///   this binary.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let current = schema_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        current,
        latest,
        pending.len()
    );
    Ok(pending.len())
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
