//! Front end for starting a run.
//!
//! Takes the per-user lock, settles what to do about an existing destination
//! data folder, then runs the chosen coordinator on a dedicated worker thread.
//! The lock travels with the worker and is released when the run ends.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::errors::{FailureKind, MigrateError};
use crate::fs_ops::{remove_tree, MigrationLock};
use crate::sync::DEFAULT_POLL_INTERVAL;

use super::coordinator::{MigrationCoordinator, MigrationEnv};
use super::path_switch::PathSwitchCoordinator;
use super::{MigrationOutcome, MigrationRequest};

/// Which coordinator a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Migrate,
    PathSwitch,
}

/// What to do when the destination data folder already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingDataChoice {
    /// Do not start; the listener hears `on_cancelled`.
    Cancel,
    /// Keep the data already at the target and only switch the root.
    UseExisting,
    /// Delete the existing destination data folder, then migrate.
    Overwrite,
}

pub struct StorageMigration {
    env: MigrationEnv,
    request: MigrationRequest,
    mode: RunMode,
    existing: Option<ExistingDataChoice>,
    lock_dir: Option<PathBuf>,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl StorageMigration {
    pub fn new(env: MigrationEnv, request: MigrationRequest) -> Self {
        Self {
            env,
            request,
            mode: RunMode::Migrate,
            existing: None,
            lock_dir: None,
            cancel: CancelToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Without a choice an existing destination fails the run with
    /// `DestinationAlreadyExists`.
    pub fn on_existing_data(mut self, choice: ExistingDataChoice) -> Self {
        self.existing = Some(choice);
        self
    }

    /// Serialize runs per user through a lock file in `dir`.
    pub fn lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn request(&self) -> &MigrationRequest {
        &self.request
    }

    /// Start the run in the background.
    ///
    /// Errors: `MigrateError::AlreadyRunning` when another run for the same user
    /// holds the lock, `MigrateError::Cancelled` when the existing destination
    /// was declined. Both are decided before any worker starts.
    pub fn start(&self) -> Result<MigrationHandle> {
        let lock = match &self.lock_dir {
            Some(dir) => Some(MigrationLock::try_acquire(dir, &self.request.user)?),
            None => None,
        };

        let mut mode = self.mode;
        let mut clear_destination = false;
        if mode == RunMode::Migrate && self.env.fs.exists(&self.request.target_data()) {
            match self.existing {
                Some(ExistingDataChoice::Cancel) => {
                    info!(path = %self.request.target_data().display(), "Destination data exists; cancelled");
                    self.env.listener.on_cancelled();
                    return Err(MigrateError::Cancelled.into());
                }
                Some(ExistingDataChoice::UseExisting) => {
                    info!("Destination data exists; switching root without copying");
                    mode = RunMode::PathSwitch;
                }
                Some(ExistingDataChoice::Overwrite) => clear_destination = true,
                None => {}
            }
        }

        let worker = Worker {
            env: self.env.clone(),
            request: self.request.clone(),
            mode,
            clear_destination,
            cancel: self.cancel.clone(),
            poll_interval: self.poll_interval,
        };
        let thread = thread::Builder::new()
            .name("storage-migrate".into())
            .spawn(move || {
                let _lock = lock;
                worker.run()
            })
            .context("spawn migration worker")?;
        Ok(MigrationHandle { thread, mode })
    }

    /// Start and wait.
    pub fn run_blocking(&self) -> Result<MigrationOutcome> {
        Ok(self.start()?.join()?)
    }

    /// Recover from a `NotReadable` failure by switching the root in place.
    pub fn switch_after_unreadable(&self) -> Result<MigrationOutcome> {
        let _lock = match &self.lock_dir {
            Some(dir) => Some(MigrationLock::try_acquire(dir, &self.request.user)?),
            None => None,
        };
        info!("Source not readable; switching storage root without moving data");
        Ok(PathSwitchCoordinator::new(self.env.clone())
            .with_cancel(self.cancel.clone())
            .with_poll_interval(self.poll_interval)
            .run(&self.request))
    }
}

/// Handle to a run started with `StorageMigration::start`.
pub struct MigrationHandle {
    thread: JoinHandle<MigrationOutcome>,
    mode: RunMode,
}

impl MigrationHandle {
    /// Mode actually used, after the existing-destination choice was applied.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> Result<MigrationOutcome, MigrateError> {
        self.thread.join().map_err(|_| MigrateError::WorkerPanicked)
    }
}

struct Worker {
    env: MigrationEnv,
    request: MigrationRequest,
    mode: RunMode,
    clear_destination: bool,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl Worker {
    fn run(self) -> MigrationOutcome {
        debug!(mode = ?self.mode, "migration worker started");
        match self.mode {
            RunMode::PathSwitch => PathSwitchCoordinator::new(self.env)
                .with_cancel(self.cancel)
                .with_poll_interval(self.poll_interval)
                .run(&self.request),
            RunMode::Migrate => {
                if self.clear_destination {
                    let target = self.request.target_data();
                    let report = remove_tree(&*self.env.fs, &target);
                    if report.is_clean() {
                        info!(path = %target.display(), removed = report.removed, "Removed existing destination data");
                    } else {
                        // The availability check will reject what is left.
                        let kind = FailureKind::UncleanRollback { path: target, failed: report.failed };
                        warn!(code = kind.code(), kind = kind.kind(), "{kind}");
                    }
                }
                MigrationCoordinator::new(self.env)
                    .with_cancel(self.cancel)
                    .with_poll_interval(self.poll_interval)
                    .run(&self.request)
            }
        }
    }
}
