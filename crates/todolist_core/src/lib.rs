//! Persistence core for the todo-list application.
//! Owns the item store, its configuration and the logging bootstrap.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DatabaseConfig, LoggingConfig, StoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::item::{Item, ItemId};
pub use repo::item_repo::{ItemStorage, RepoError, RepoResult, SqliteItemStore};
pub use repo::shared::{init_shared_store, shared_store, SharedStoreError};
pub use service::item_service::ItemService;
