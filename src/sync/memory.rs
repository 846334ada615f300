//! In-process sync provider for embedders without an external sync engine.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AccountRef, SyncProvider};

#[derive(Debug, Clone, Copy, Default)]
struct AccountState {
    auto_sync: bool,
    active: bool,
}

/// Thread-safe map of account -> (auto-sync flag, sync active). Every flag write
/// is also appended to a history log for inspection.
#[derive(Debug, Default)]
pub struct MemorySyncProvider {
    accounts: Mutex<HashMap<AccountRef, AccountState>>,
    history: Mutex<Vec<(AccountRef, bool)>>,
}

impl MemorySyncProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account: AccountRef, auto_sync: bool) {
        let mut map = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(account, AccountState { auto_sync, active: false });
    }

    pub fn set_active(&self, account: &AccountRef, active: bool) {
        let mut map = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(state) = map.get_mut(account) {
            state.active = active;
        }
    }

    /// Current auto-sync flag, `None` for unknown accounts.
    pub fn auto_sync(&self, account: &AccountRef) -> Option<bool> {
        let map = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
        map.get(account).map(|s| s.auto_sync)
    }

    /// Every `set_auto_sync_enabled` call, in order.
    pub fn history(&self) -> Vec<(AccountRef, bool)> {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl SyncProvider for MemorySyncProvider {
    fn is_auto_sync_enabled(&self, account: &AccountRef) -> Result<bool> {
        self.auto_sync(account)
            .ok_or_else(|| anyhow!("unknown account {account}"))
    }

    fn set_auto_sync_enabled(&self, account: &AccountRef, enabled: bool) -> Result<()> {
        {
            let mut map = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
            let state = map
                .get_mut(account)
                .ok_or_else(|| anyhow!("unknown account {account}"))?;
            state.auto_sync = enabled;
        }
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((account.clone(), enabled));
        Ok(())
    }

    fn is_sync_active(&self, account: &AccountRef) -> Result<bool> {
        let map = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
        map.get(account)
            .map(|s| s.active)
            .ok_or_else(|| anyhow!("unknown account {account}"))
    }
}
