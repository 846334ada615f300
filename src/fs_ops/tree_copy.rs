//! Directory tree copy.
//! Walks the source with an explicit work stack (no recursion, so deep trees
//! cannot exhaust the call stack) and copies every regular file byte for byte.
//! The first failure aborts the copy; partial output is left for the rollback
//! cleaner.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::FailureKind;

use super::fs::{EntryKind, Filesystem};
use super::helpers::describe_io;

/// Counters reported after a successful copy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

pub struct TreeCopier<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
}

impl<'a, F: Filesystem + ?Sized> TreeCopier<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Copy `src_dir` into `dst_dir`, creating `dst_dir` and its missing ancestors.
    /// An absent `src_dir` yields an empty `dst_dir`.
    pub fn copy(&self, src_dir: &Path, dst_dir: &Path) -> Result<CopyStats, FailureKind> {
        let mut stats = CopyStats::default();
        let source_present = self.fs.exists(src_dir);
        let mut stack: Vec<(PathBuf, PathBuf)> = vec![(src_dir.to_path_buf(), dst_dir.to_path_buf())];

        while let Some((src, dst)) = stack.pop() {
            self.fs
                .create_dir_all(&dst)
                .map_err(|e| FailureKind::copy_failed(&dst, describe_io("create directory", &dst, &e)))?;
            stats.dirs += 1;

            if !source_present {
                debug!(src = %src.display(), "source data folder absent; nothing to copy");
                break;
            }

            let entries = self
                .fs
                .list_entries(&src)
                .map_err(|e| FailureKind::copy_failed(&src, describe_io("list directory", &src, &e)))?;

            for entry in entries {
                let Some(name) = entry.path.file_name() else {
                    continue;
                };
                let target = dst.join(name);
                match entry.kind {
                    EntryKind::Dir => stack.push((entry.path, target)),
                    EntryKind::File => self.copy_one(&entry.path, &target, &mut stats)?,
                    // Symlinked files are copied as their contents; symlinked
                    // directories are not followed (cycles).
                    EntryKind::Symlink if !self.fs.is_dir(&entry.path) => {
                        self.copy_one(&entry.path, &target, &mut stats)?
                    }
                    EntryKind::Symlink | EntryKind::Other => {
                        return Err(FailureKind::copy_failed(
                            &entry.path,
                            "unsupported entry type (special file or symlinked directory)",
                        ));
                    }
                }
            }
        }

        info!(
            src = %src_dir.display(),
            dst = %dst_dir.display(),
            files = stats.files,
            dirs = stats.dirs,
            bytes = stats.bytes,
            "Copied data tree"
        );
        Ok(stats)
    }

    fn copy_one(&self, src: &Path, dst: &Path, stats: &mut CopyStats) -> Result<(), FailureKind> {
        let bytes = self
            .fs
            .copy_file(src, dst)
            .map_err(|e| FailureKind::copy_failed(src, describe_io("copy file", dst, &e)))?;
        debug!(src = %src.display(), dst = %dst.display(), bytes, "copied file");
        stats.files += 1;
        stats.bytes += bytes;
        Ok(())
    }
}
