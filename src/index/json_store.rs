//! JSON-file implementation of the persisted index.
//!
//! The whole document is rewritten through a temp file + rename, so a failed
//! update leaves the previous index untouched.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::platform::atomic_write_0600;

use super::{rewrite_prefix, PersistedIndex};

/// One file known to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub user: String,
    /// Path on the remote side; never rewritten.
    pub remote_path: String,
    /// Absolute local path, when the file has been downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDoc {
    #[serde(default)]
    files: Vec<StoredFile>,
}

#[derive(Debug)]
pub struct JsonFileIndex {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records; an absent file is an empty index.
    pub fn records(&self) -> Result<Vec<StoredFile>> {
        Ok(self.load()?.files)
    }

    pub fn insert(&self, record: StoredFile) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = self.load()?;
        doc.files.push(record);
        self.store(&doc)
    }

    fn load(&self) -> Result<IndexDoc> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(IndexDoc::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parse index '{}'", self.path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(IndexDoc::default()),
            Err(e) => Err(e).with_context(|| format!("read index '{}'", self.path.display())),
        }
    }

    fn store(&self, doc: &IndexDoc) -> Result<()> {
        let body = serde_json::to_vec_pretty(doc).context("serialize index")?;
        atomic_write_0600(&self.path, &body)
            .with_context(|| format!("write index '{}'", self.path.display()))
    }
}

impl PersistedIndex for JsonFileIndex {
    fn migrate_stored_paths(&self, user: &str, old_root: &Path, new_root: &Path) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = self.load()?;
        let mut changed = 0usize;
        for file in doc.files.iter_mut().filter(|f| f.user == user) {
            let Some(old) = file.storage_path.as_deref() else {
                continue;
            };
            if let Some(new) = rewrite_prefix(old, old_root, new_root) {
                file.storage_path = Some(new);
                changed += 1;
            }
        }
        if changed == 0 {
            debug!(user, "no index records under old root");
            return Ok(());
        }
        self.store(&doc)?;
        debug!(user, changed, "rewrote stored paths");
        Ok(())
    }
}
