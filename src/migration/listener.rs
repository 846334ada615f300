//! Progress reporting seam between a run and whoever started it.
//!
//! Callbacks are invoked synchronously on the worker thread at each phase
//! boundary, so implementations should return quickly.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{info, warn};

use super::phase::Phase;

pub trait MigrationListener: Send + Sync {
    fn on_phase(&self, _phase: Phase) {}

    /// Called exactly once per run. `result_path` is the target root on success
    /// and the source root on failure.
    fn on_finished(&self, result_path: &Path, succeeded: bool);

    /// The run was declined before it started.
    fn on_cancelled(&self) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MigrationListener for NoopListener {
    fn on_finished(&self, _result_path: &Path, _succeeded: bool) {}
}

/// Turns callbacks into tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl MigrationListener for LoggingListener {
    fn on_phase(&self, phase: Phase) {
        info!(phase = phase.label(), "{phase}");
    }

    fn on_finished(&self, result_path: &Path, succeeded: bool) {
        if succeeded {
            info!(path = %result_path.display(), "Migration finished");
        } else {
            warn!(path = %result_path.display(), "Migration failed; data left at source");
        }
    }

    fn on_cancelled(&self) {
        info!("Migration cancelled before start");
    }
}

/// One message per callback, for callers that consume progress on another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    Phase(Phase),
    Finished { result_path: PathBuf, succeeded: bool },
    Cancelled,
}

/// Forwards every callback over a channel. A dropped receiver is ignored.
pub struct ChannelListener {
    sender: Sender<MigrationEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<MigrationEvent>) -> Self {
        ChannelListener { sender }
    }
}

impl MigrationListener for ChannelListener {
    fn on_phase(&self, phase: Phase) {
        let _ = self.sender.send(MigrationEvent::Phase(phase));
    }

    fn on_finished(&self, result_path: &Path, succeeded: bool) {
        let _ = self.sender.send(MigrationEvent::Finished {
            result_path: result_path.to_path_buf(),
            succeeded,
        });
    }

    fn on_cancelled(&self) {
        let _ = self.sender.send(MigrationEvent::Cancelled);
    }
}
