//! CLI definition and parsing.
//!
//! Notes:
//! - Flags are global so they may appear before or after the subcommand.
//! - With no subcommand the binary runs `migrate`.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::types::{Config, LogLevel};
use crate::migration::ExistingDataChoice;

/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Move an application's data folder to another storage root"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Storage root the data currently lives under.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Storage root to move the data to.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub target: Option<PathBuf>,

    /// Name of the data folder beneath each root.
    #[arg(long, global = true)]
    pub data_folder: Option<String>,

    /// User whose stored-file records are rewritten.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Account whose auto-sync is paused during the run (repeatable; replaces configured accounts).
    #[arg(long = "account", global = true, value_name = "NAME")]
    pub accounts: Vec<String>,

    /// Sync provider tag for the accounts.
    #[arg(long, global = true)]
    pub authority: Option<String>,

    /// JSON stored-file index.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub index_file: Option<PathBuf>,

    /// JSON auto-sync state file.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub sync_state_file: Option<PathBuf>,

    /// Milliseconds between "is a sync still running" checks.
    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Directory holding per-user run locks.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub lock_dir: Option<PathBuf>,

    /// Write logs to this file as well as stderr.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging (shorthand for --log-level debug).
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Set log level: quiet, normal, info, debug.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the config file location used by storage_migrate and exit.
    #[arg(long, global = true)]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Copy the data folder to the target root, update the index, remove the old copy.
    Migrate(MigrateArgs),
    /// Switch to the target root without moving any data.
    Switch,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateArgs {
    /// What to do when the target already has a data folder (asked interactively if omitted on a TTY).
    #[arg(long, value_enum)]
    pub on_existing: Option<ExistingArg>,

    /// If a storage root is not readable, switch roots without copying instead of failing.
    #[arg(long)]
    pub switch_if_unreadable: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingArg {
    Cancel,
    UseExisting,
    Overwrite,
}

impl From<ExistingArg> for ExistingDataChoice {
    fn from(arg: ExistingArg) -> Self {
        match arg {
            ExistingArg::Cancel => ExistingDataChoice::Cancel,
            ExistingArg::UseExisting => ExistingDataChoice::UseExisting,
            ExistingArg::Overwrite => ExistingDataChoice::Overwrite,
        }
    }
}

impl Args {
    /// Subcommand to run; `migrate` with default options when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Migrate(MigrateArgs::default()))
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(p) = &self.source {
            cfg.source_root = Some(p.clone());
        }
        if let Some(p) = &self.target {
            cfg.target_root = Some(p.clone());
        }
        if let Some(folder) = &self.data_folder {
            cfg.data_folder = folder.clone();
        }
        if let Some(user) = &self.user {
            cfg.user = Some(user.clone());
        }
        if !self.accounts.is_empty() {
            cfg.accounts = self.accounts.clone();
        }
        if let Some(authority) = &self.authority {
            cfg.authority = authority.clone();
        }
        if let Some(p) = &self.index_file {
            cfg.index_file = Some(p.clone());
        }
        if let Some(p) = &self.sync_state_file {
            cfg.sync_state_file = Some(p.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            cfg.sync_poll_interval = Duration::from_millis(ms);
        }
        if let Some(p) = &self.lock_dir {
            cfg.lock_dir = Some(p.clone());
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
