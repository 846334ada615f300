//! The migration workflow: phases, the listener seam, and the two coordinators.

mod coordinator;
mod listener;
mod path_switch;
mod phase;
mod runner;

pub use coordinator::{MigrationCoordinator, MigrationEnv};
pub use listener::{ChannelListener, LoggingListener, MigrationEvent, MigrationListener, NoopListener};
pub use path_switch::PathSwitchCoordinator;
pub use phase::Phase;
pub use runner::{ExistingDataChoice, MigrationHandle, RunMode, StorageMigration};

use std::path::{Path, PathBuf};

use crate::errors::FailureKind;
use crate::sync::AccountRef;

/// Everything one run needs to know. Immutable for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    /// Name of the data folder directly beneath each root.
    pub data_folder: String,
    /// Whose index records are rewritten.
    pub user: String,
    /// Accounts whose background sync is paused for the run.
    pub scope: Vec<AccountRef>,
}

impl MigrationRequest {
    pub fn new(
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        data_folder: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
            data_folder: data_folder.into(),
            user: user.into(),
            scope: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: Vec<AccountRef>) -> Self {
        self.scope = scope;
        self
    }

    pub fn source_data(&self) -> PathBuf {
        self.source_root.join(&self.data_folder)
    }

    pub fn target_data(&self) -> PathBuf {
        self.target_root.join(&self.data_folder)
    }

    /// Where the data lives after a run with the given result.
    pub fn result_root(&self, succeeded: bool) -> &Path {
        if succeeded { &self.target_root } else { &self.source_root }
    }
}

/// Result of exactly one run.
#[derive(Debug)]
pub enum MigrationOutcome {
    Success,
    Failure(FailureKind),
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MigrationOutcome::Success)
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match self {
            MigrationOutcome::Success => None,
            MigrationOutcome::Failure(kind) => Some(kind),
        }
    }

    /// Process exit status: 0 on success, the failure's code otherwise.
    pub fn code(&self) -> i32 {
        self.failure().map_or(0, FailureKind::code)
    }
}
