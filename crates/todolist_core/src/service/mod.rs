//! Core use-case services.
//!
//! # Responsibility
//! - Turn storage primitives into todo-list use cases.
//! - Keep callers decoupled from the concrete storage backend.

pub mod item_service;
