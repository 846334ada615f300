//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a commented template if the default file is missing (unless
//!   STORAGE_MIGRATE_CONFIG is set).
//!
//! Unknown XML fields are rejected so typos surface instead of being ignored.

use anyhow::{bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_index_path, default_log_path, default_sync_state_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{CONFIG_ENV, DATA_FOLDER_DEFAULT, DEFAULT_AUTHORITY};
use crate::platform::{atomic_write_0600, set_dir_mode_0700};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    source_root: Option<String>,
    target_root: Option<String>,
    data_folder: Option<String>,
    user: Option<String>,
    authority: Option<String>,
    /// Comma separated account names.
    accounts: Option<String>,
    index_file: Option<String>,
    sync_state_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    sync_poll_interval_ms: Option<u64>,
    lock_dir: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();
    cfg.source_root = non_empty(parsed.source_root).map(PathBuf::from);
    cfg.target_root = non_empty(parsed.target_root).map(PathBuf::from);
    if let Some(folder) = non_empty(parsed.data_folder) {
        cfg.data_folder = folder;
    }
    cfg.user = non_empty(parsed.user);
    if let Some(authority) = non_empty(parsed.authority) {
        cfg.authority = authority;
    }
    cfg.accounts = parsed
        .accounts
        .as_deref()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    cfg.index_file = non_empty(parsed.index_file).map(PathBuf::from);
    cfg.sync_state_file = non_empty(parsed.sync_state_file).map(PathBuf::from);
    if let Some(ms) = parsed.sync_poll_interval_ms {
        cfg.sync_poll_interval = Duration::from_millis(ms);
    }
    cfg.lock_dir = non_empty(parsed.lock_dir).map(PathBuf::from);
    if let Some(level) = parsed.log_level.as_deref().and_then(LogLevel::parse) {
        cfg.log_level = level;
    }
    cfg.log_file = non_empty(parsed.log_file).map(PathBuf::from);
    cfg
}

/// Load a Config from a specific XML file.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig =
        from_xml_str(&contents).with_context(|| format!("parse config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "Loaded config");
    Ok(xml_to_config(parsed))
}

/// Outcome of locating the config file.
#[derive(Debug)]
pub enum LoadResult {
    Loaded(Config, PathBuf),
    /// The default file was missing and a template was written there.
    CreatedTemplate(PathBuf),
    /// An explicit STORAGE_MIGRATE_CONFIG points at a file that does not exist.
    Missing(PathBuf),
}

/// Load the config, writing a template at the default location when it is missing.
pub fn load_or_init() -> Result<LoadResult> {
    let path = default_config_path()?;
    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }
    if env::var_os(CONFIG_ENV).is_some() {
        return Ok(LoadResult::Missing(path));
    }
    create_template_config(&path)?;
    Ok(LoadResult::CreatedTemplate(path))
}

/// Write a commented template. Refuses symlinked ancestors; the file is 0600
/// and written atomically.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing to create config: ancestor of {} is a symlink", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create config directory '{}'", parent.display()))?;
        let _ = set_dir_mode_0700(parent);
    }

    let show = |p: Result<PathBuf>, fallback: &str| p.map(|p| p.display().to_string()).unwrap_or_else(|_| fallback.into());
    let content = format!(
        "<!--\n  storage_migrate configuration (XML)\n\n    source_root            -> storage root the data currently lives under\n    target_root            -> storage root to move the data to\n    data_folder            -> name of the data folder beneath each root\n    user                   -> whose stored-file records are rewritten\n    authority              -> sync provider tag for the accounts below\n    accounts               -> comma separated accounts whose auto-sync is paused\n    index_file             -> JSON stored-file index\n    sync_state_file        -> JSON auto-sync state file\n    sync_poll_interval_ms  -> how often to check whether a sync is still running\n    log_level              -> quiet | normal | info | debug\n    log_file               -> path to log file (optional)\n\n  CLI flags override XML values.\n-->\n<config>\n  <source_root></source_root>\n  <target_root></target_root>\n  <data_folder>{}</data_folder>\n  <user></user>\n  <authority>{}</authority>\n  <accounts></accounts>\n  <index_file>{}</index_file>\n  <sync_state_file>{}</sync_state_file>\n  <sync_poll_interval_ms>1000</sync_poll_interval_ms>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        DATA_FOLDER_DEFAULT,
        DEFAULT_AUTHORITY,
        show(default_index_path(), "/path/to/index.json"),
        show(default_sync_state_path(), "/path/to/sync_state.json"),
        show(default_log_path(), "/path/to/storage_migrate.log"),
    );

    atomic_write_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
