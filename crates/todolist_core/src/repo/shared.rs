//! Process-wide item store.
//!
//! # Responsibility
//! - Construct at most one `SqliteItemStore` per process, on first request.
//! - Hand every caller the same `Arc` handle.
//!
//! # Invariants
//! - Concurrent first callers block until the single construction finishes;
//!   a failed construction leaves the slot empty so a later call may retry.
//! - Requests naming a different database than the active one are rejected.
//!   Paths are compared after resolving them against the working directory
//!   and following symlinks, so `./a.db` and `a.db` name the same database.
//! - Closing the shared store ends its lifetime for the whole process.

use crate::config::{DatabaseConfig, IN_MEMORY_PATH};
use crate::db::DbError;
use crate::repo::item_repo::SqliteItemStore;
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

static SHARED_STORE: OnceCell<SharedStore> = OnceCell::new();

struct SharedStore {
    path: PathBuf,
    store: Arc<SqliteItemStore>,
}

/// Errors from shared store initialization.
#[derive(Debug)]
pub enum SharedStoreError {
    /// First construction failed.
    Open(DbError),
    /// A store for another database is already active.
    Conflict { active: PathBuf, requested: PathBuf },
}

impl Display for SharedStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open shared item store: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "shared item store already opened at `{}`; refusing to switch to `{}`",
                active.display(),
                requested.display()
            ),
        }
    }
}

impl Error for SharedStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) => Some(err),
            Self::Conflict { .. } => None,
        }
    }
}

/// Returns the process-wide store, constructing it from `config` on first use.
///
/// Later calls with the same database path return the existing handle.
pub fn init_shared_store(
    config: &DatabaseConfig,
) -> Result<Arc<SqliteItemStore>, SharedStoreError> {
    let shared = SHARED_STORE.get_or_try_init(|| {
        let store = SqliteItemStore::open(config).map_err(SharedStoreError::Open)?;
        info!(
            "event=shared_store_init module=repo status=ok in_memory={}",
            config.is_in_memory()
        );
        Ok::<_, SharedStoreError>(SharedStore {
            path: database_identity(&config.path),
            store: Arc::new(store),
        })
    })?;

    let requested = database_identity(&config.path);
    if shared.path != requested {
        return Err(SharedStoreError::Conflict {
            active: shared.path.clone(),
            requested,
        });
    }
    Ok(Arc::clone(&shared.store))
}

/// Resolves `path` to the form used to compare databases.
///
/// Existing files resolve through symlinks; missing ones fall back to the
/// lexical absolute path. `:memory:` stays as is.
fn database_identity(path: &Path) -> PathBuf {
    if path.as_os_str() == IN_MEMORY_PATH {
        return path.to_path_buf();
    }
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Returns the process-wide store if it has been initialized.
pub fn shared_store() -> Option<Arc<SqliteItemStore>> {
    SHARED_STORE.get().map(|shared| Arc::clone(&shared.store))
}
