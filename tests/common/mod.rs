//! Shared fixtures for integration tests: a fault-injecting filesystem, an
//! index and sync provider that journal their calls, and a recording listener.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storage_migrate::fs_ops::{Entry, EntryKind};
use storage_migrate::{
    AccountRef, Filesystem, JsonFileIndex, MemorySyncProvider, MigrationEnv, MigrationListener, MigrationRequest,
    PersistedIndex, Phase, StdFs, StoredFile, SyncProvider,
};

pub const USER: &str = "alice";
pub const DATA: &str = "data";
pub const FAST_POLL: Duration = Duration::from_millis(5);

/// Ordered log of side effects shared by every fake.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.entries().iter().position(|e| pred(e))
    }

    pub fn last_position(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.entries().iter().rposition(|e| pred(e))
    }
}

/// `StdFs` with configurable faults. Mutating calls are journaled.
#[derive(Clone)]
pub struct FaultyFs {
    inner: StdFs,
    journal: Journal,
    unreadable: Vec<PathBuf>,
    unwritable: Vec<PathBuf>,
    free_space: Option<u64>,
    fail_copy_named: Option<String>,
    fail_remove_named: Option<String>,
}

impl FaultyFs {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: StdFs,
            journal,
            unreadable: Vec::new(),
            unwritable: Vec::new(),
            free_space: None,
            fail_copy_named: None,
            fail_remove_named: None,
        }
    }

    pub fn unreadable(mut self, path: &Path) -> Self {
        self.unreadable.push(path.to_path_buf());
        self
    }

    pub fn unwritable(mut self, path: &Path) -> Self {
        self.unwritable.push(path.to_path_buf());
        self
    }

    pub fn free_space(mut self, bytes: u64) -> Self {
        self.free_space = Some(bytes);
        self
    }

    pub fn fail_copy_on(mut self, file_name: &str) -> Self {
        self.fail_copy_named = Some(file_name.into());
        self
    }

    pub fn fail_remove_on(mut self, file_name: &str) -> Self {
        self.fail_remove_named = Some(file_name.into());
        self
    }

    fn named(path: &Path, name: &Option<String>) -> bool {
        match name {
            Some(n) => path.file_name().is_some_and(|f| f == n.as_str()),
            None => false,
        }
    }
}

impl Filesystem for FaultyFs {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        self.inner.entry_kind(path)
    }

    fn can_read(&self, path: &Path) -> bool {
        !self.unreadable.iter().any(|p| p == path) && self.inner.can_read(path)
    }

    fn can_write(&self, path: &Path) -> bool {
        !self.unwritable.iter().any(|p| p == path) && self.inner.can_write(path)
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        match self.free_space {
            Some(n) => Ok(n),
            None => self.inner.free_space(path),
        }
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        self.inner.list_entries(dir)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.journal.push(format!("mkdir {}", path.display()));
        self.inner.create_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        if Self::named(src, &self.fail_copy_named) {
            return Err(io::Error::other("injected copy failure"));
        }
        self.journal.push(format!("copy {}", src.display()));
        self.inner.copy_file(src, dst)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if Self::named(path, &self.fail_remove_named) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected remove failure"));
        }
        self.journal.push(format!("remove {}", path.display()));
        self.inner.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.journal.push(format!("rmdir {}", path.display()));
        self.inner.remove_dir(path)
    }

    fn tree_size(&self, root: &Path) -> io::Result<u64> {
        self.inner.tree_size(root)
    }
}

/// JSON index that journals rewrites and can be told to fail.
pub struct RecordingIndex {
    pub inner: JsonFileIndex,
    journal: Journal,
    fail: bool,
}

impl RecordingIndex {
    pub fn new(path: PathBuf, journal: Journal, fail: bool) -> Self {
        Self { inner: JsonFileIndex::new(path), journal, fail }
    }
}

impl PersistedIndex for RecordingIndex {
    fn migrate_stored_paths(&self, user: &str, old_root: &Path, new_root: &Path) -> Result<()> {
        if self.fail {
            self.journal.push("index failed");
            return Err(anyhow!("index store is read-only"));
        }
        self.inner.migrate_stored_paths(user, old_root, new_root)?;
        self.journal.push("index");
        Ok(())
    }
}

/// In-memory sync provider that journals flag writes and can refuse reads,
/// pauses, or the write that restores an account after its pause.
pub struct RecordingSync {
    pub inner: MemorySyncProvider,
    journal: Journal,
    fail_reads: bool,
    refuse_pause: Mutex<Vec<String>>,
    fail_restore: Mutex<Vec<String>>,
    paused: Mutex<Vec<String>>,
}

impl RecordingSync {
    pub fn new(journal: Journal) -> Self {
        Self::build(journal, false)
    }

    pub fn failing_reads(journal: Journal) -> Self {
        Self::build(journal, true)
    }

    fn build(journal: Journal, fail_reads: bool) -> Self {
        Self {
            inner: MemorySyncProvider::new(),
            journal,
            fail_reads,
            refuse_pause: Mutex::default(),
            fail_restore: Mutex::default(),
            paused: Mutex::default(),
        }
    }

    /// Turning auto-sync off for `name` fails.
    pub fn refuse_pause_for(&self, name: &str) {
        self.refuse_pause.lock().unwrap().push(name.into());
    }

    /// Any write for `name` after it has been paused fails.
    pub fn fail_restore_for(&self, name: &str) {
        self.fail_restore.lock().unwrap().push(name.into());
    }
}

impl SyncProvider for RecordingSync {
    fn is_auto_sync_enabled(&self, account: &AccountRef) -> Result<bool> {
        if self.fail_reads {
            return Err(anyhow!("sync settings unavailable"));
        }
        self.inner.is_auto_sync_enabled(account)
    }

    fn set_auto_sync_enabled(&self, account: &AccountRef, enabled: bool) -> Result<()> {
        let name = &account.name;
        if !enabled && self.refuse_pause.lock().unwrap().contains(name) {
            self.journal.push(format!("sync {name}={enabled} refused"));
            return Err(anyhow!("auto-sync setting is locked"));
        }
        if self.paused.lock().unwrap().contains(name) && self.fail_restore.lock().unwrap().contains(name) {
            self.journal.push(format!("sync {name}={enabled} refused"));
            return Err(anyhow!("sync settings store is read-only"));
        }
        self.journal.push(format!("sync {name}={enabled}"));
        self.inner.set_auto_sync_enabled(account, enabled)?;
        if !enabled {
            self.paused.lock().unwrap().push(name.clone());
        }
        Ok(())
    }

    fn is_sync_active(&self, account: &AccountRef) -> Result<bool> {
        self.inner.is_sync_active(account)
    }
}

/// Captures every listener callback.
#[derive(Default)]
pub struct RecordingListener {
    phases: Mutex<Vec<Phase>>,
    finished: Mutex<Vec<(PathBuf, bool)>>,
    cancelled: Mutex<usize>,
    journal: Option<Journal>,
}

impl RecordingListener {
    pub fn with_journal(journal: Journal) -> Self {
        Self { journal: Some(journal), ..Self::default() }
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<(PathBuf, bool)> {
        self.finished.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> usize {
        *self.cancelled.lock().unwrap()
    }
}

impl MigrationListener for RecordingListener {
    fn on_phase(&self, phase: Phase) {
        if let Some(j) = &self.journal {
            j.push(format!("phase {}", phase.label()));
        }
        self.phases.lock().unwrap().push(phase);
    }

    fn on_finished(&self, result_path: &Path, succeeded: bool) {
        self.finished.lock().unwrap().push((result_path.to_path_buf(), succeeded));
    }

    fn on_cancelled(&self) {
        *self.cancelled.lock().unwrap() += 1;
    }
}

/// A source root with three files (10 bytes total), an empty target root, an
/// index with records under the source, and two sync accounts.
pub struct Fixture {
    pub temp: TempDir,
    pub src_root: PathBuf,
    pub dst_root: PathBuf,
    pub journal: Journal,
    pub sync: Arc<RecordingSync>,
    pub index: Arc<RecordingIndex>,
    pub listener: Arc<RecordingListener>,
    pub accounts: Vec<AccountRef>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn with_failing_index() -> Self {
        Self::build(true, false)
    }

    pub fn with_failing_sync_reads() -> Self {
        Self::build(false, true)
    }

    fn build(fail_index: bool, fail_sync_reads: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let src = temp.child("src");
        src.child("data/a.txt").write_str("aaaa").unwrap();
        src.child("data/docs/b.txt").write_str("bbb").unwrap();
        src.child("data/docs/deep/c.bin").write_binary(&[1, 2, 3]).unwrap();
        let dst = temp.child("dst");
        dst.create_dir_all().unwrap();

        let journal = Journal::default();
        let accounts = vec![AccountRef::new("alice", "org.example"), AccountRef::new("bob", "org.example")];
        let sync = if fail_sync_reads {
            RecordingSync::failing_reads(journal.clone())
        } else {
            RecordingSync::new(journal.clone())
        };
        sync.inner.add_account(accounts[0].clone(), true);
        sync.inner.add_account(accounts[1].clone(), false);

        let index = RecordingIndex::new(temp.path().join("index.json"), journal.clone(), fail_index);
        for (user, rel) in [(USER, "data/a.txt"), (USER, "data/docs/b.txt"), ("bob", "data/docs/deep/c.bin")] {
            index
                .inner
                .insert(StoredFile {
                    user: user.into(),
                    remote_path: format!("/{rel}"),
                    storage_path: Some(src.path().join(rel)),
                })
                .unwrap();
        }

        Self {
            src_root: src.path().to_path_buf(),
            dst_root: dst.path().to_path_buf(),
            listener: Arc::new(RecordingListener::with_journal(journal.clone())),
            sync: Arc::new(sync),
            index: Arc::new(index),
            journal,
            accounts,
            temp,
        }
    }

    pub fn fs(&self) -> FaultyFs {
        FaultyFs::new(self.journal.clone())
    }

    pub fn request(&self) -> MigrationRequest {
        MigrationRequest::new(&self.src_root, &self.dst_root, DATA, USER).with_scope(self.accounts.clone())
    }

    pub fn env(&self, fs: FaultyFs) -> MigrationEnv {
        MigrationEnv {
            fs: Arc::new(fs),
            sync: self.sync.clone(),
            index: self.index.clone(),
            listener: self.listener.clone(),
        }
    }

    pub fn src_data(&self) -> PathBuf {
        self.src_root.join(DATA)
    }

    pub fn dst_data(&self) -> PathBuf {
        self.dst_root.join(DATA)
    }

    /// Auto-sync flags in account order.
    pub fn flags(&self) -> Vec<Option<bool>> {
        self.accounts.iter().map(|a| self.sync.inner.auto_sync(a)).collect()
    }

    pub fn storage_paths(&self, user: &str) -> Vec<PathBuf> {
        self.index
            .inner
            .records()
            .unwrap()
            .into_iter()
            .filter(|r| r.user == user)
            .filter_map(|r| r.storage_path)
            .collect()
    }
}

/// Relative path -> contents for every file under `root`, sorted.
pub fn snapshot_tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect();
    out.sort();
    out
}
