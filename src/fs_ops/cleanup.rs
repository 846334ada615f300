//! Best-effort tree removal for rollback and post-success cleanup.
//!
//! Removal is an iterative post-order walk that keeps going past individual
//! failures so as much as possible is removed, then reports what was left.
//! Neither entry point escalates: by the time they run, the run's outcome is
//! already decided.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::FailureKind;

use super::fs::{EntryKind, Filesystem};

/// What a removal pass achieved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub struct RollbackCleaner<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
}

impl<'a, F: Filesystem + ?Sized> RollbackCleaner<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Remove whatever the run wrote to the destination data folder.
    pub fn rollback_on_failure(&self, target_data_folder: &Path) -> CleanupReport {
        let report = remove_tree(self.fs, target_data_folder);
        if report.is_clean() {
            debug!(path = %target_data_folder.display(), removed = report.removed, "Rollback complete");
        } else {
            let kind = FailureKind::UncleanRollback {
                path: target_data_folder.to_path_buf(),
                failed: report.failed,
            };
            warn!(code = kind.code(), kind = kind.kind(), removed = report.removed, "{kind}");
        }
        report
    }

    /// Remove the source data folder once the index points at the new root.
    /// A data folder that is itself a symlink loses only the link.
    pub fn cleanup_on_success(&self, source_data_folder: &Path) -> CleanupReport {
        if let Some(target) = self.symlink_target(source_data_folder) {
            warn!(
                path = %source_data_folder.display(),
                target = %target.display(),
                "Old data folder is a symlink; removing the link only, linked data left in place"
            );
        }
        let report = remove_tree(self.fs, source_data_folder);
        if report.is_clean() {
            info!(path = %source_data_folder.display(), removed = report.removed, "Removed old data folder");
        } else {
            warn!(
                path = %source_data_folder.display(),
                removed = report.removed,
                failed = report.failed,
                "Migration cleanup step failed; old data folder left partially in place"
            );
        }
        report
    }

    fn symlink_target(&self, path: &Path) -> Option<PathBuf> {
        match self.fs.entry_kind(path) {
            Ok(Some(EntryKind::Symlink)) => {
                Some(self.fs.read_link(path).unwrap_or_else(|_| path.to_path_buf()))
            }
            _ => None,
        }
    }
}

/// Remove `root` and everything beneath it. An absent `root` is a clean no-op.
/// Symlinks are unlinked, never followed.
pub fn remove_tree<F: Filesystem + ?Sized>(fs: &F, root: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    let root_kind = match fs.entry_kind(root) {
        Ok(Some(kind)) => kind,
        Ok(None) => return report,
        Err(e) => {
            warn!(error = %e, path = %root.display(), "Failed to stat path for removal");
            report.failed += 1;
            return report;
        }
    };

    // (path, kind, children_already_queued)
    let mut stack: Vec<(PathBuf, EntryKind, bool)> = vec![(root.to_path_buf(), root_kind, false)];
    while let Some((path, kind, expanded)) = stack.pop() {
        if kind == EntryKind::Dir && !expanded {
            stack.push((path.clone(), kind, true));
            match fs.list_entries(&path) {
                Ok(children) => {
                    for child in children {
                        stack.push((child.path, child.kind, false));
                    }
                }
                Err(e) => {
                    // remove_dir below will fail too and be counted there.
                    warn!(error = %e, path = %path.display(), "Failed to list directory for removal");
                }
            }
            continue;
        }

        let res = if kind == EntryKind::Dir {
            fs.remove_dir(&path)
        } else {
            fs.remove_file(&path)
        };
        match res {
            Ok(()) => report.removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to remove");
                report.failed += 1;
            }
        }
    }
    report
}
