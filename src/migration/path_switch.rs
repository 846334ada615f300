//! Switch the storage root without moving data.
//!
//! Only the sync pause/restore machinery runs: background sync is quiesced so
//! nothing writes under the old root while the caller repoints the application.

use std::time::Duration;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::sync::{IdleWait, SyncGuard, DEFAULT_POLL_INTERVAL};

use super::coordinator::MigrationEnv;
use super::phase::Phase;
use super::{MigrationOutcome, MigrationRequest};

pub struct PathSwitchCoordinator {
    env: MigrationEnv,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl PathSwitchCoordinator {
    pub fn new(env: MigrationEnv) -> Self {
        Self {
            env,
            cancel: CancelToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Never touches the filesystem and always succeeds.
    pub fn run(&self, req: &MigrationRequest) -> MigrationOutcome {
        let listener = &self.env.listener;
        let guard = SyncGuard::new(&*self.env.sync, &req.scope, self.cancel.clone())
            .with_poll_interval(self.poll_interval);

        listener.on_phase(Phase::Preparing);
        info!(
            source = %req.source_root.display(),
            target = %req.target_root.display(),
            "Switching storage root without moving data"
        );

        listener.on_phase(Phase::SavingSyncState);
        let snapshot = match guard.snapshot() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Could not save sync configuration; leaving auto-sync untouched");
                None
            }
        };

        // Without a snapshot there is nothing to restore, so do not pause.
        if snapshot.is_some() {
            listener.on_phase(Phase::PausingSync);
            if let Err(e) = guard.pause_all() {
                warn!(error = %format!("{e:#}"), "Continuing path switch with auto-sync partly enabled");
            }
        }

        listener.on_phase(Phase::AwaitingSyncIdle);
        if guard.await_idle() == IdleWait::Interrupted {
            warn!("Stopped waiting for running syncs");
        }

        listener.on_phase(Phase::RestoringSyncState);
        guard.restore(snapshot);

        listener.on_phase(Phase::Done);
        listener.on_finished(&req.target_root, true);
        MigrationOutcome::Success
    }
}
