//! Sync provider backed by a JSON state file.
//!
//! Layout:
//! - `<state_file>`: `{"accounts": {"<authority>/<name>": {"auto_sync": true}}}`
//! - `<state_dir>/<name>.syncing`: present while a sync job for that account runs.
//!
//! Accounts missing from the file default to auto-sync enabled. Updates are
//! read-modify-write under an in-process mutex and land atomically on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

use crate::platform::atomic_write_0600;

use super::{AccountRef, SyncProvider};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default)]
    accounts: BTreeMap<String, AccountEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct AccountEntry {
    auto_sync: bool,
}

#[derive(Debug)]
pub struct StateFileSyncProvider {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StateFileSyncProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marker whose presence means a sync job for `account` is running.
    pub fn marker_path(&self, account: &AccountRef) -> PathBuf {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let name: String = account
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') { c } else { '_' })
            .collect();
        dir.join(format!("{name}.syncing"))
    }

    fn key(account: &AccountRef) -> String {
        format!("{}/{}", account.authority, account.name)
    }

    fn load(&self) -> Result<StateDoc> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(StateDoc::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parse sync state '{}'", self.path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StateDoc::default()),
            Err(e) => Err(e).with_context(|| format!("read sync state '{}'", self.path.display())),
        }
    }
}

impl SyncProvider for StateFileSyncProvider {
    fn is_auto_sync_enabled(&self, account: &AccountRef) -> Result<bool> {
        let doc = self.load()?;
        Ok(doc
            .accounts
            .get(&Self::key(account))
            .map(|e| e.auto_sync)
            .unwrap_or(true))
    }

    fn set_auto_sync_enabled(&self, account: &AccountRef, enabled: bool) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = self.load()?;
        doc.accounts
            .insert(Self::key(account), AccountEntry { auto_sync: enabled });
        let body = serde_json::to_vec_pretty(&doc).context("serialize sync state")?;
        atomic_write_0600(&self.path, &body)?;
        trace!(%account, enabled, path = %self.path.display(), "wrote auto-sync flag");
        Ok(())
    }

    fn is_sync_active(&self, account: &AccountRef) -> Result<bool> {
        Ok(self.marker_path(account).exists())
    }
}
