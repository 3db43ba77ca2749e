//! Item domain model.
//!
//! # Responsibility
//! - Define the single persisted todo-list entry.
//! - Provide constructors for new items and id-only lookup criteria.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one; after that it is the key.
//! - `description`, `done` and `created_at` are opaque to the store and
//!   persisted verbatim.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Database-assigned item identifier.
pub type ItemId = i64;

/// One to-do list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Assigned by the store on first merge.
    pub id: Option<ItemId>,
    pub description: String,
    pub done: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Item {
    /// Creates a not-yet-persisted, not-done item stamped with the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_created_at(description, now_epoch_ms())
    }

    /// Creates a not-yet-persisted item with a caller-provided timestamp.
    pub fn with_created_at(description: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: None,
            description: description.into(),
            done: false,
            created_at,
        }
    }

    /// Lookup criteria carrying only an id, for [`ItemStorage::get`].
    ///
    /// [`ItemStorage::get`]: crate::repo::item_repo::ItemStorage::get
    pub fn criteria(id: ItemId) -> Self {
        Self {
            id: Some(id),
            description: String::new(),
            done: false,
            created_at: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
