//! Filesystem side of a migration: the `Filesystem` seam, availability gates,
//! tree copy, best-effort removal and the per-user run lock.

mod availability;
mod cleanup;
mod fs;
mod helpers;
mod lock;
mod tree_copy;
mod util;

pub use availability::AvailabilityChecker;
pub use cleanup::{remove_tree, CleanupReport, RollbackCleaner};
pub use fs::{Entry, EntryKind, Filesystem, StdFs};
pub use helpers::{describe_io, io_error_with_help};
pub use lock::MigrationLock;
pub use tree_copy::{CopyStats, TreeCopier};
pub use util::format_bytes;
