//! Background-sync collaborators.
//!
//! The migration never talks to a sync engine directly: it reads and writes each
//! account's auto-sync flag and polls its "sync active" status through
//! `SyncProvider`, and `SyncGuard` sequences those calls.
//!
//! Precondition: while a run holds sync paused, nothing else may toggle the
//! auto-sync flags of the accounts in scope. This is not locked internally.

mod guard;
mod memory;
mod state_file;

pub use guard::{IdleWait, SyncGuard, SyncSnapshot, DEFAULT_POLL_INTERVAL};
pub use memory::MemorySyncProvider;
pub use state_file::StateFileSyncProvider;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An account whose background sync may touch the data tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountRef {
    pub name: String,
    /// Which sync provider governs this account.
    pub authority: String,
}

impl AccountRef {
    pub fn new(name: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authority: authority.into(),
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.authority)
    }
}

/// Per-account access to the externally owned sync state.
pub trait SyncProvider: Send + Sync {
    fn is_auto_sync_enabled(&self, account: &AccountRef) -> Result<bool>;
    fn set_auto_sync_enabled(&self, account: &AccountRef, enabled: bool) -> Result<()>;
    fn is_sync_active(&self, account: &AccountRef) -> Result<bool>;
}
