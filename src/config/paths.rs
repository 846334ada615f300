//! Default path helpers and symlink checks.
//! Config, log, index, sync-state and lock locations are OS-appropriate by
//! default; when STORAGE_MIGRATE_CONFIG is set everything else is colocated
//! next to that config file.

use anyhow::{anyhow, Context, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

const APP_DIR: &str = "storage_migrate";

/// Config file path. Honors STORAGE_MIGRATE_CONFIG: relative values resolve
/// against the current directory, and a directory value gets `config.xml` appended.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV) {
        let mut p = PathBuf::from(raw);
        if p.is_relative() {
            let cwd = env::current_dir().context("resolve current directory")?;
            p = cwd.join(p);
        }
        if p.is_dir() {
            p.push("config.xml");
        }
        return Ok(p);
    }
    let base = config_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no HOME)"))?;
    Ok(base.join(APP_DIR).join("config.xml"))
}

/// Directory for the log, the default index and state files, and locks.
fn state_dir() -> Result<PathBuf> {
    if env::var_os(CONFIG_ENV).is_some() {
        let cfg = default_config_path()?;
        return cfg
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("config path has no parent: {}", cfg.display()));
    }
    let base = data_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .ok_or_else(|| anyhow!("cannot determine a data directory (no HOME)"))?;
    Ok(base.join(APP_DIR))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("storage_migrate.log"))
}

pub fn default_index_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("index.json"))
}

pub fn default_sync_state_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("sync_state.json"))
}

pub fn default_lock_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("locks"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
