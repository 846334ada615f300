//! Single-flight guard for migration runs.
//!
//! Design:
//! - One sidecar lock file per user under a lock directory: `<dir>/<user>.lock`.
//! - An exclusive advisory lock (fs2) is taken without blocking; contention means
//!   another run for the same user is live, in this process or another.
//! - The lock is released when the guard is dropped. The file itself is left in
//!   place; unlinking it would let a waiter lock an orphaned inode.

use anyhow::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::errors::MigrateError;

use super::helpers::io_error_with_help;

/// RAII guard held for the lifetime of one migration run.
#[derive(Debug)]
pub struct MigrationLock {
    file: File,
    path: PathBuf,
}

impl MigrationLock {
    /// Try to take the lock for `user`. Fails with `MigrateError::AlreadyRunning`
    /// when another holder exists.
    pub fn try_acquire(lock_dir: &Path, user: &str) -> Result<Self> {
        fs::create_dir_all(lock_dir).map_err(io_error_with_help("create lock directory", lock_dir))?;
        let path = lock_dir.join(format!("{}.lock", sanitize(user)));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io_error_with_help("open lock file", &path))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), user, "Acquired migration lock");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(MigrateError::AlreadyRunning(user.to_string()).into())
            }
            Err(e) => Err(io_error_with_help("lock", &path)(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        trace!(path = %self.path.display(), "Released migration lock");
    }
}

/// Map a user identifier onto a portable file name.
fn sanitize(user: &str) -> String {
    let s: String = user
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if s.is_empty() || s.chars().all(|c| c == '.') {
        "_".into()
    } else {
        s
    }
}
