//! Domain model for todo-list entries.
//!
//! # Invariants
//! - An item has no id until the store assigns one on first merge.
//! - Ids are never reused for another item.

pub mod item;
