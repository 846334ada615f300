//! Persisted file index and the rewrite step that repoints it.

mod json_store;

pub use json_store::{JsonFileIndex, StoredFile};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::errors::FailureKind;

/// Store of file records keyed by absolute local path.
pub trait PersistedIndex: Send + Sync {
    /// Replace the `old_root` prefix with `new_root` in every stored path owned by
    /// `user`. Must be all-or-nothing.
    fn migrate_stored_paths(&self, user: &str, old_root: &Path, new_root: &Path) -> Result<()>;
}

/// Point of no return of a migration: once this succeeds the old tree is disposable.
pub struct IndexRewriter<'a, I: PersistedIndex + ?Sized> {
    index: &'a I,
}

impl<'a, I: PersistedIndex + ?Sized> IndexRewriter<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    pub fn rewrite(&self, user: &str, old_root: &Path, new_root: &Path) -> Result<(), FailureKind> {
        match self.index.migrate_stored_paths(user, old_root, new_root) {
            Ok(()) => {
                info!(user, old = %old_root.display(), new = %new_root.display(), "Index updated");
                Ok(())
            }
            Err(e) => {
                error!(user, error = ?e, "Index update failed");
                Err(FailureKind::IndexUpdateFailed { cause: e.into() })
            }
        }
    }
}

/// Swap the `old_root` prefix of `path` for `new_root`, matching whole path
/// components only (`/a/data2` is not under `/a/data`). `None` when `path` is
/// not under `old_root`.
pub fn rewrite_prefix(path: &Path, old_root: &Path, new_root: &Path) -> Option<PathBuf> {
    let old = dunce::simplified(old_root);
    let rest = dunce::simplified(path).strip_prefix(old).ok()?;
    if rest.as_os_str().is_empty() {
        Some(new_root.to_path_buf())
    } else {
        Some(new_root.join(rest))
    }
}
