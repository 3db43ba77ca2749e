//! Item storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide get / merge / update / get_all / close over the `items` table.
//! - Run every operation in its own pooled connection and transaction.
//!
//! # Invariants
//! - Each operation commits on success and rolls back on error; the error
//!   reaches the caller unchanged.
//! - The pooled connection is released on every exit path.
//! - `get` reports a missing item as `Ok(None)`, never as an error.
//! - After `close()` every operation fails with `RepoError::Closed`.

use crate::config::DatabaseConfig;
use crate::db::{open_pool, ConnectionPool, DbError, DbResult, PooledConnection};
use crate::model::item::{Item, ItemId};
use log::{debug, error, info, warn};
use rusqlite::{params, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    description,
    done,
    created_at
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from item storage operations.
#[derive(Debug)]
pub enum RepoError {
    /// Connection, SQL or constraint failure; the transaction was rolled back.
    Db(DbError),
    /// The store was closed.
    Closed,
    /// An operation required an existing item.
    NotFound(ItemId),
    /// An update-only operation got an item that was never persisted.
    MissingId,
    /// A persisted row could not be decoded.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "item store is closed"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::MissingId => write!(f, "item has no id; update requires a persisted item"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Closed | Self::NotFound(_) | Self::MissingId | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<r2d2::Error> for RepoError {
    fn from(value: r2d2::Error) -> Self {
        Self::Db(DbError::Pool(value))
    }
}

/// Item storage capability shared by all backends.
pub trait ItemStorage {
    /// Returns the item with `id`, or `None` when absent.
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>>;

    /// Returns the persisted item matching the id carried by `criteria`.
    ///
    /// Criteria without an id match nothing.
    fn get(&self, criteria: &Item) -> RepoResult<Option<Item>> {
        match criteria.id {
            Some(id) => self.get_by_id(id),
            None => Ok(None),
        }
    }

    /// Updates the row with `item.id`, or inserts a new row with a fresh id
    /// when the id is unset or unmatched. Returns the persisted item.
    fn merge(&self, item: &Item) -> RepoResult<Item>;

    /// Overwrites the existing row with `item.id` without ever inserting.
    ///
    /// Fails with `RepoError::MissingId` when the item has no id and with
    /// `RepoError::NotFound` when its row is gone.
    fn update(&self, item: &Item) -> RepoResult<Item>;

    /// Returns every persisted item. Order is not part of the contract.
    fn get_all(&self) -> RepoResult<Vec<Item>>;

    /// Releases the underlying connection factory. Safe to call repeatedly.
    fn close(&self);
}

impl<S: ItemStorage + ?Sized> ItemStorage for Arc<S> {
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>> {
        (**self).get_by_id(id)
    }

    fn merge(&self, item: &Item) -> RepoResult<Item> {
        (**self).merge(item)
    }

    fn update(&self, item: &Item) -> RepoResult<Item> {
        (**self).update(item)
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        (**self).get_all()
    }

    fn close(&self) {
        (**self).close();
    }
}

impl<S: ItemStorage + ?Sized> ItemStorage for &S {
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>> {
        (**self).get_by_id(id)
    }

    fn merge(&self, item: &Item) -> RepoResult<Item> {
        (**self).merge(item)
    }

    fn update(&self, item: &Item) -> RepoResult<Item> {
        (**self).update(item)
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        (**self).get_all()
    }

    fn close(&self) {
        (**self).close();
    }
}

/// SQLite-backed item store. `Send + Sync`; share it by reference or `Arc`.
#[derive(Debug)]
pub struct SqliteItemStore {
    pool: RwLock<Option<ConnectionPool>>,
}

impl SqliteItemStore {
    /// Opens the connection factory described by `config`.
    ///
    /// Failure here is fatal for callers: the store cannot operate.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        Ok(Self::from_pool(open_pool(config)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DatabaseConfig::in_memory())
    }

    /// Wraps an already migrated pool.
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self {
            pool: RwLock::new(Some(pool)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Deletes every item and returns how many rows were removed.
    ///
    /// Intended for test fixtures; not part of [`ItemStorage`]. Ids stay
    /// monotonic across a clear.
    pub fn clear(&self) -> RepoResult<usize> {
        self.with_transaction("clear", TransactionBehavior::Immediate, |tx| {
            Ok(tx.execute("DELETE FROM items;", [])?)
        })
    }

    fn checkout_pool(&self) -> RepoResult<ConnectionPool> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RepoError::Closed)
    }

    /// Runs `operation` inside one connection and transaction.
    ///
    /// Commits when `operation` succeeds; otherwise rolls back and returns
    /// the operation's error unchanged.
    fn with_transaction<T, F>(
        &self,
        op: &'static str,
        behavior: TransactionBehavior,
        operation: F,
    ) -> RepoResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> RepoResult<T>,
    {
        let started_at = Instant::now();
        let pool = self.checkout_pool()?;
        let mut conn: PooledConnection = pool.get()?;
        let tx = conn.transaction_with_behavior(behavior)?;

        match operation(&tx) {
            Ok(value) => {
                if let Err(err) = tx.commit() {
                    error!(
                        "event=item_tx module=repo op={} status=commit_failed duration_ms={} error={}",
                        op,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err.into());
                }
                debug!(
                    "event=item_tx module=repo op={} status=ok duration_ms={}",
                    op,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=item_tx module=repo op={} status=rollback_failed error={}",
                        op, rollback_err
                    );
                }
                warn!(
                    "event=item_tx module=repo op={} status=rolled_back duration_ms={} error={}",
                    op,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl ItemStorage for SqliteItemStore {
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>> {
        self.with_transaction("get", TransactionBehavior::Deferred, |tx| {
            let mut stmt = tx.prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_item_row(row)?));
            }
            Ok(None)
        })
    }

    fn merge(&self, item: &Item) -> RepoResult<Item> {
        self.with_transaction("merge", TransactionBehavior::Immediate, |tx| {
            if let Some(id) = item.id {
                if update_row(tx, id, item)? {
                    return Ok(item.clone());
                }
            }

            tx.execute(
                "INSERT INTO items (description, done, created_at) VALUES (?1, ?2, ?3);",
                params![item.description.as_str(), item.done, item.created_at],
            )?;
            let id = tx.last_insert_rowid();
            Ok(Item {
                id: Some(id),
                ..item.clone()
            })
        })
    }

    fn update(&self, item: &Item) -> RepoResult<Item> {
        let id = item.id.ok_or(RepoError::MissingId)?;
        self.with_transaction("update", TransactionBehavior::Immediate, |tx| {
            if update_row(tx, id, item)? {
                Ok(item.clone())
            } else {
                Err(RepoError::NotFound(id))
            }
        })
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        self.with_transaction("get_all", TransactionBehavior::Deferred, |tx| {
            let mut stmt = tx.prepare(&format!("{ITEM_SELECT_SQL} ORDER BY id ASC;"))?;
            let mut rows = stmt.query([])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(parse_item_row(row)?);
            }
            Ok(items)
        })
    }

    fn close(&self) {
        let released = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match released {
            Some(pool) => {
                drop(pool);
                info!("event=store_close module=repo status=ok");
            }
            None => debug!("event=store_close module=repo status=already_closed"),
        }
    }
}

/// Overwrites row `id` with `item`'s fields; `false` when no row matched.
fn update_row(tx: &Transaction<'_>, id: ItemId, item: &Item) -> RepoResult<bool> {
    let changed = tx.execute(
        "UPDATE items
         SET
            description = ?1,
            done = ?2,
            created_at = ?3
         WHERE id = ?4;",
        params![item.description.as_str(), item.done, item.created_at, id],
    )?;
    Ok(changed > 0)
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let done = match row.get::<_, i64>("done")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid done value `{other}` in items.done"
            )));
        }
    };

    Ok(Item {
        id: Some(row.get("id")?),
        description: row.get("description")?,
        done,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{ItemStorage, RepoError, SqliteItemStore};
    use crate::model::item::Item;
    use rusqlite::TransactionBehavior;

    #[test]
    fn failed_operation_rolls_back_earlier_writes() {
        let store = SqliteItemStore::open_in_memory().unwrap();

        let result: Result<(), RepoError> =
            store.with_transaction("test", TransactionBehavior::Immediate, |tx| {
                tx.execute(
                    "INSERT INTO items (description, done, created_at) VALUES ('partial', 0, 1);",
                    [],
                )?;
                Err(RepoError::InvalidData("forced failure".to_string()))
            });

        assert!(matches!(result, Err(RepoError::InvalidData(message)) if message == "forced failure"));
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn connection_is_reusable_after_rollback() {
        let store = SqliteItemStore::open_in_memory().unwrap();

        let _ = store.with_transaction::<(), _>("test", TransactionBehavior::Deferred, |_| {
            Err(RepoError::InvalidData("boom".to_string()))
        });

        let merged = store.merge(&Item::with_created_at("after rollback", 5)).unwrap();
        assert_eq!(store.get(&merged).unwrap(), Some(merged));
    }

    #[test]
    fn invalid_done_value_is_reported_not_masked() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let item = store.merge(&Item::with_created_at("flag", 1)).unwrap();

        let pool = store.checkout_pool().unwrap();
        let conn = pool.get().unwrap();
        conn.execute_batch("PRAGMA ignore_check_constraints = ON;").unwrap();
        conn.execute("UPDATE items SET done = 7;", []).unwrap();
        drop(conn);

        let err = store.get(&item).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("items.done")));
    }
}
