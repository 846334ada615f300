//! Typed error definitions for storage_migrate.
//! `FailureKind` is the closed set of ways a migration run can fail; `MigrateError`
//! covers the front end (locking, pre-run cancellation, configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Why a migration run failed. Each kind maps to one user-facing message.
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("Storage root is not readable: {path}")]
    NotReadable { path: PathBuf },

    #[error("Storage root is not writable: {path}")]
    NotWritable { path: PathBuf },

    #[error("Destination data folder already exists: {path}")]
    DestinationAlreadyExists { path: PathBuf },

    #[error("Insufficient space on destination: need {required} bytes, have {available} bytes")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Copy failed at {path}: {reason}")]
    CopyFailed { path: PathBuf, reason: String },

    #[error("Failed to update the file index: {cause}")]
    IndexUpdateFailed {
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Auto-sync flags could not be read, so sync was never paused.
    #[error("Could not save sync configuration: {reason}")]
    SyncStateUnavailable { reason: String },

    /// Auto-sync could not be turned off for every account in scope.
    #[error("Could not pause auto-sync: {reason}")]
    SyncPauseFailed { reason: String },

    /// Logged only; never replaces the failure that triggered the rollback.
    #[error("Rollback left {failed} entries behind under {path}")]
    UncleanRollback { path: PathBuf, failed: usize },
}

impl FailureKind {
    /// Stable numeric code for logs and process exit status.
    pub fn code(&self) -> i32 {
        match self {
            FailureKind::NotReadable { .. } => 10,
            FailureKind::NotWritable { .. } => 11,
            FailureKind::DestinationAlreadyExists { .. } => 12,
            FailureKind::InsufficientSpace { .. } => 13,
            FailureKind::CopyFailed { .. } => 14,
            FailureKind::IndexUpdateFailed { .. } => 15,
            FailureKind::SyncStateUnavailable { .. } => 16,
            FailureKind::SyncPauseFailed { .. } => 17,
            FailureKind::UncleanRollback { .. } => 18,
        }
    }

    /// Short machine-friendly slug used as the `kind` field in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureKind::NotReadable { .. } => "not_readable",
            FailureKind::NotWritable { .. } => "not_writable",
            FailureKind::DestinationAlreadyExists { .. } => "destination_exists",
            FailureKind::InsufficientSpace { .. } => "insufficient_space",
            FailureKind::CopyFailed { .. } => "copy_failed",
            FailureKind::IndexUpdateFailed { .. } => "index_update_failed",
            FailureKind::SyncStateUnavailable { .. } => "sync_state_unavailable",
            FailureKind::SyncPauseFailed { .. } => "sync_pause_failed",
            FailureKind::UncleanRollback { .. } => "unclean_rollback",
        }
    }

    /// The one failure for which a caller may fall back to switching the path
    /// without copying.
    pub fn is_not_readable(&self) -> bool {
        matches!(self, FailureKind::NotReadable { .. })
    }

    pub(crate) fn copy_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FailureKind::CopyFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised around a run rather than by it.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Another migration is already running for user '{0}'")]
    AlreadyRunning(String),

    #[error("Migration cancelled before it started")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Migration worker panicked")]
    WorkerPanicked,
}

impl MigrateError {
    /// Exit status used by the binary. 75 is EX_TEMPFAIL, 130 mirrors SIGINT.
    pub fn code(&self) -> i32 {
        match self {
            MigrateError::AlreadyRunning(_) => 75,
            MigrateError::Cancelled => 130,
            MigrateError::Config(_) => 78,
            MigrateError::WorkerPanicked => 70,
        }
    }
}
