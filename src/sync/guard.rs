//! Pause/restore of automatic background sync around a migration.

use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;

use super::{AccountRef, SyncProvider};

/// Interval between "is sync still running" polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Auto-sync flags as they were before the run paused them, in scope order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    entries: Vec<(AccountRef, bool)>,
}

impl SyncSnapshot {
    pub fn entries(&self) -> &[(AccountRef, bool)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How `await_idle` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleWait {
    Idle,
    /// Cancellation was requested before every account went idle.
    Interrupted,
}

pub struct SyncGuard<'a, P: SyncProvider + ?Sized> {
    provider: &'a P,
    accounts: &'a [AccountRef],
    poll_interval: Duration,
    cancel: CancelToken,
}

impl<'a, P: SyncProvider + ?Sized> SyncGuard<'a, P> {
    pub fn new(provider: &'a P, accounts: &'a [AccountRef], cancel: CancelToken) -> Self {
        Self {
            provider,
            accounts,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Read every account's auto-sync flag. Read only; all or nothing.
    pub fn snapshot(&self) -> Result<SyncSnapshot> {
        let mut entries = Vec::with_capacity(self.accounts.len());
        for account in self.accounts {
            let enabled = self.provider.is_auto_sync_enabled(account).map_err(|e| {
                e.context(format!("read auto-sync flag for {account}"))
            })?;
            debug!(%account, enabled, "saved auto-sync state");
            entries.push((account.clone(), enabled));
        }
        Ok(SyncSnapshot { entries })
    }

    /// Turn auto-sync off for every account. Safe to call repeatedly.
    ///
    /// Every account is attempted even after a failure; the error names each
    /// account that kept auto-sync on.
    pub fn pause_all(&self) -> Result<()> {
        let mut failures = Vec::new();
        for account in self.accounts {
            if let Err(e) = self.provider.set_auto_sync_enabled(account, false) {
                warn!(%account, error = %e, "Failed to disable auto-sync");
                failures.push(format!("{account}: {e:#}"));
            }
        }
        if !failures.is_empty() {
            return Err(anyhow!("auto-sync still enabled for {}", failures.join("; ")));
        }
        info!(accounts = self.accounts.len(), "Auto-sync paused");
        Ok(())
    }

    /// Block until no account has a sync in progress, polling at the configured
    /// interval. Cancellation stops the wait without error.
    pub fn await_idle(&self) -> IdleWait {
        for account in self.accounts {
            loop {
                match self.provider.is_sync_active(account) {
                    Ok(false) => break,
                    Ok(true) => {
                        debug!(%account, "waiting for running sync to finish");
                    }
                    Err(e) => {
                        warn!(%account, error = %e, "Cannot query sync status; treating as idle");
                        break;
                    }
                }
                if self.cancel.wait_timeout(self.poll_interval) {
                    warn!(%account, "Interrupted while waiting for account to end syncing");
                    return IdleWait::Interrupted;
                }
            }
        }
        IdleWait::Idle
    }

    /// Write back the flags from `snapshot`. `None` (capture never happened) is a
    /// no-op. Per-account failures are logged and skipped. Returns how many
    /// accounts could not be restored.
    pub fn restore(&self, snapshot: Option<SyncSnapshot>) -> usize {
        let Some(snapshot) = snapshot else {
            debug!("no sync snapshot captured; nothing to restore");
            return 0;
        };
        let mut failed = 0;
        for (account, enabled) in snapshot.entries {
            if let Err(e) = self.provider.set_auto_sync_enabled(&account, enabled) {
                warn!(%account, enabled, error = %e, "Failed to restore auto-sync flag");
                failed += 1;
            }
        }
        if failed == 0 {
            info!("Auto-sync configuration restored");
        }
        failed
    }
}
