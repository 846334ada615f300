//! Full migration: check, pause sync, copy, rewrite the index, clean up.
//!
//! Every exit path funnels through `RestoringSyncState`, and the listener hears
//! `on_finished` exactly once. Phase bodies return `Result<_, FailureKind>`;
//! the first error switches the run onto the rollback path.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::errors::FailureKind;
use crate::fs_ops::{AvailabilityChecker, Filesystem, RollbackCleaner, TreeCopier};
use crate::index::{IndexRewriter, PersistedIndex};
use crate::sync::{IdleWait, SyncGuard, SyncProvider, SyncSnapshot, DEFAULT_POLL_INTERVAL};

use super::listener::MigrationListener;
use super::phase::Phase;
use super::{MigrationOutcome, MigrationRequest};

/// The collaborators a run talks to.
#[derive(Clone)]
pub struct MigrationEnv {
    pub fs: Arc<dyn Filesystem>,
    pub sync: Arc<dyn SyncProvider>,
    pub index: Arc<dyn PersistedIndex>,
    pub listener: Arc<dyn MigrationListener>,
}

pub struct MigrationCoordinator {
    env: MigrationEnv,
    cancel: CancelToken,
    poll_interval: Duration,
}

/// What the forward path has done so far, consulted when unwinding.
#[derive(Default)]
struct Progress {
    snapshot: Option<SyncSnapshot>,
    wrote_destination: bool,
}

impl MigrationCoordinator {
    pub fn new(env: MigrationEnv) -> Self {
        Self {
            env,
            cancel: CancelToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Token that interrupts the wait for running syncs.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn run(&self, req: &MigrationRequest) -> MigrationOutcome {
        let guard = SyncGuard::new(&*self.env.sync, &req.scope, self.cancel.clone())
            .with_poll_interval(self.poll_interval);
        let mut progress = Progress::default();

        self.enter(Phase::Preparing);
        info!(
            source = %req.source_root.display(),
            target = %req.target_root.display(),
            data_folder = %req.data_folder,
            user = %req.user,
            accounts = req.scope.len(),
            "Starting storage migration"
        );

        let outcome = match self.forward(req, &guard, &mut progress) {
            Ok(()) => {
                self.enter(Phase::RestoringSyncState);
                guard.restore(progress.snapshot.take());
                self.enter(Phase::Done);
                MigrationOutcome::Success
            }
            Err(kind) => {
                error!(code = kind.code(), kind = kind.kind(), "{kind}");
                self.enter(Phase::RollingBack);
                if progress.wrote_destination {
                    RollbackCleaner::new(&*self.env.fs).rollback_on_failure(&req.target_data());
                }
                self.enter(Phase::RestoringSyncState);
                guard.restore(progress.snapshot.take());
                self.enter(Phase::Failed);
                MigrationOutcome::Failure(kind)
            }
        };

        let succeeded = outcome.is_success();
        self.env.listener.on_finished(req.result_root(succeeded), succeeded);
        outcome
    }

    fn forward(
        &self,
        req: &MigrationRequest,
        guard: &SyncGuard<'_, dyn SyncProvider>,
        progress: &mut Progress,
    ) -> Result<(), FailureKind> {
        let fs = &*self.env.fs;

        self.enter(Phase::CheckingAvailability);
        AvailabilityChecker::new(fs).check(&req.source_root, &req.target_root, &req.data_folder)?;

        self.enter(Phase::SavingSyncState);
        let snapshot = guard
            .snapshot()
            .map_err(|e| FailureKind::SyncStateUnavailable { reason: format!("{e:#}") })?;
        progress.snapshot = Some(snapshot);

        // Copying with any account still syncing risks concurrent writes, so a
        // partial pause is terminal; the saved snapshot is restored on unwind.
        self.enter(Phase::PausingSync);
        guard
            .pause_all()
            .map_err(|e| FailureKind::SyncPauseFailed { reason: format!("{e:#}") })?;

        self.enter(Phase::AwaitingSyncIdle);
        if guard.await_idle() == IdleWait::Interrupted {
            warn!("Stopped waiting for running syncs; copying anyway");
        }

        self.enter(Phase::Copying);
        progress.wrote_destination = true;
        TreeCopier::new(fs).copy(&req.source_data(), &req.target_data())?;

        self.enter(Phase::UpdatingIndex);
        IndexRewriter::new(&*self.env.index).rewrite(&req.user, &req.source_root, &req.target_root)?;

        self.enter(Phase::CleaningUp);
        RollbackCleaner::new(fs).cleanup_on_success(&req.source_data());
        Ok(())
    }

    fn enter(&self, phase: Phase) {
        self.env.listener.on_phase(phase);
    }
}
