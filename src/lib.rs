//! Core library for `storage_migrate`.
//!
//! Moves an application's data folder from one storage root to another while
//! background sync is paused and the stored-file index is kept consistent.
//! `migration::MigrationCoordinator` drives the workflow; the leaf components
//! live in `fs_ops`, `sync` and `index`, each behind a trait so embedders can
//! supply their own filesystem, sync engine and index.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod index;
pub mod logging;
pub mod migration;
pub mod output;
pub mod platform;
pub mod sync;

pub use cancel::CancelToken;
pub use config::{default_config_path, default_log_path, path_has_symlink_ancestor, Config, LogLevel};
pub use errors::{FailureKind, MigrateError};
pub use fs_ops::{AvailabilityChecker, CleanupReport, CopyStats, Filesystem, RollbackCleaner, StdFs, TreeCopier};
pub use index::{IndexRewriter, JsonFileIndex, PersistedIndex, StoredFile};
pub use migration::{
    ExistingDataChoice, MigrationCoordinator, MigrationEnv, MigrationHandle, MigrationListener, MigrationOutcome,
    MigrationRequest, PathSwitchCoordinator, Phase, RunMode, StorageMigration,
};
pub use sync::{AccountRef, MemorySyncProvider, StateFileSyncProvider, SyncGuard, SyncProvider, SyncSnapshot};

/// Convenient imports for embedders.
pub mod prelude {
    pub use crate::{
        AccountRef, CancelToken, ExistingDataChoice, FailureKind, Filesystem, MigrateError, MigrationCoordinator,
        MigrationEnv, MigrationListener, MigrationOutcome, MigrationRequest, PathSwitchCoordinator, PersistedIndex,
        Phase, StdFs, StorageMigration, SyncProvider,
    };
    pub use anyhow::Result as AnyResult;
}
