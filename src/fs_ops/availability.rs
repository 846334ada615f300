//! Destination availability gates.
//!
//! Evaluated in a fixed order and short-circuiting on the first failure:
//! readability, writability, absence of the destination data folder, free space.
//! Readability comes first because an unreadable root makes every later gate
//! meaningless and maps to the one failure a caller may recover from by
//! switching paths instead of copying.

use std::path::Path;
use tracing::{debug, warn};

use crate::errors::FailureKind;

use super::fs::Filesystem;
use super::util::format_bytes;

/// Validates that a migration from `source` to `target` can start.
pub struct AvailabilityChecker<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
}

impl<'a, F: Filesystem + ?Sized> AvailabilityChecker<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Run all gates. Never mutates the filesystem.
    pub fn check(&self, source: &Path, target: &Path, data_folder: &str) -> Result<(), FailureKind> {
        for root in [source, target] {
            if !self.fs.can_read(root) {
                return Err(FailureKind::NotReadable { path: root.to_path_buf() });
            }
        }
        debug!(source = %source.display(), target = %target.display(), "roots readable");

        for root in [source, target] {
            if !self.fs.can_write(root) {
                return Err(FailureKind::NotWritable { path: root.to_path_buf() });
            }
        }
        debug!(source = %source.display(), target = %target.display(), "roots writable");

        let dst_data = target.join(data_folder);
        if self.fs.exists(&dst_data) {
            return Err(FailureKind::DestinationAlreadyExists { path: dst_data });
        }

        let src_data = source.join(data_folder);
        let required = self
            .fs
            .tree_size(&src_data)
            .map_err(|e| {
                warn!(error = %e, path = %src_data.display(), "Failed to size source data folder");
                FailureKind::NotReadable { path: src_data.clone() }
            })?;
        let available = match self.fs.free_space(target) {
            Ok(n) => n,
            Err(e) => {
                // Unknown free space is treated as none rather than guessed.
                warn!(error = %e, path = %target.display(), "Failed to query free space");
                0
            }
        };
        debug!(
            required = %format_bytes(required),
            available = %format_bytes(available),
            "space check"
        );
        if available < required {
            return Err(FailureKind::InsufficientSpace { required, available });
        }
        Ok(())
    }
}
