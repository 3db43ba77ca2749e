//! Item use-case service.
//!
//! # Responsibility
//! - Provide add / complete / rename / list entry points for callers.
//! - Delegate persistence to any `ItemStorage` implementation.
//!
//! # Invariants
//! - Updates on unknown ids fail with `RepoError::NotFound`; they never
//!   insert a new item, even when the row is deleted between the read and
//!   the write.
//! - Read-modify-write updates span two transactions; concurrent updates
//!   to one item are last-write-wins.

use crate::model::item::{Item, ItemId};
use crate::repo::item_repo::{ItemStorage, RepoError, RepoResult};

/// Use-case wrapper over an item storage backend.
pub struct ItemService<S: ItemStorage> {
    storage: S,
}

impl<S: ItemStorage> ItemService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persists a new not-done item and returns it with its assigned id.
    pub fn add_item(&self, description: impl Into<String>) -> RepoResult<Item> {
        self.storage.merge(&Item::new(description))
    }

    /// Marks an existing item done or not done.
    pub fn set_done(&self, id: ItemId, done: bool) -> RepoResult<Item> {
        let mut item = self.require_item(id)?;
        item.done = done;
        self.storage.update(&item)
    }

    /// Replaces the description of an existing item.
    pub fn rename_item(&self, id: ItemId, description: impl Into<String>) -> RepoResult<Item> {
        let mut item = self.require_item(id)?;
        item.description = description.into();
        self.storage.update(&item)
    }

    pub fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        self.storage.get_by_id(id)
    }

    /// Lists items; done items are skipped unless `include_done` is set.
    pub fn list_items(&self, include_done: bool) -> RepoResult<Vec<Item>> {
        let items = self.storage.get_all()?;
        Ok(items
            .into_iter()
            .filter(|item| include_done || !item.done)
            .collect())
    }

    fn require_item(&self, id: ItemId) -> RepoResult<Item> {
        self.storage.get_by_id(id)?.ok_or(RepoError::NotFound(id))
    }
}
