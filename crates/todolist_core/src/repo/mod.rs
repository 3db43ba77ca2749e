//! Item storage contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the `ItemStorage` capability other backends can implement.
//! - Keep SQL and transaction handling behind the repository boundary.
//! - Offer a one-time process-wide store for callers that cannot take an
//!   injected handle.

pub mod item_repo;
pub mod shared;
