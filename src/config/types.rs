//! Core configuration types.
//! - Config holds the settings for one migration, merged from XML and CLI.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{DATA_FOLDER_DEFAULT, DEFAULT_AUTHORITY};
use crate::sync::{AccountRef, DEFAULT_POLL_INTERVAL};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings and phase progress (default)
    #[default]
    Normal,
    /// Per-step detail
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for one migration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Storage root the data currently lives under
    pub source_root: Option<PathBuf>,
    /// Storage root the data moves to
    pub target_root: Option<PathBuf>,
    /// Data folder name beneath each root
    pub data_folder: String,
    /// Whose index records are rewritten
    pub user: Option<String>,
    /// Sync provider tag shared by the configured accounts
    pub authority: String,
    /// Accounts whose auto-sync is paused during the run
    pub accounts: Vec<String>,
    /// JSON stored-file index
    pub index_file: Option<PathBuf>,
    /// JSON auto-sync state file
    pub sync_state_file: Option<PathBuf>,
    pub sync_poll_interval: Duration,
    /// Where per-user run locks live
    pub lock_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: None,
            target_root: None,
            data_folder: DATA_FOLDER_DEFAULT.to_string(),
            user: None,
            authority: DEFAULT_AUTHORITY.to_string(),
            accounts: Vec::new(),
            index_file: None,
            sync_state_file: None,
            sync_poll_interval: DEFAULT_POLL_INTERVAL,
            lock_dir: None,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Configured accounts tagged with the configured authority.
    pub fn scope(&self) -> Vec<AccountRef> {
        self.accounts
            .iter()
            .map(|name| AccountRef::new(name.clone(), self.authority.clone()))
            .collect()
    }
}
