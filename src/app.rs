//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, then
//! runs a migration or path switch and maps the result to an exit status.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use storage_migrate::cli::{Args, Command, MigrateArgs};
use storage_migrate::config::{default_config_path, default_index_path, default_lock_dir, default_sync_state_path, load_or_init, Config, LoadResult, CONFIG_ENV};
use storage_migrate::logging::init_tracing;
use storage_migrate::output as out;
use storage_migrate::{
    CancelToken, ExistingDataChoice, JsonFileIndex, MigrateError, MigrationEnv, MigrationListener, MigrationOutcome,
    Phase, RunMode, StateFileSyncProvider, StdFs, StorageMigration,
};

/// Prints one line per phase and the final location of the data.
struct ConsoleListener;

impl MigrationListener for ConsoleListener {
    fn on_phase(&self, phase: Phase) {
        debug!(phase = phase.label(), "phase");
        if !phase.is_terminal() {
            out::print_step(&phase.to_string());
        }
    }

    fn on_finished(&self, result_path: &Path, succeeded: bool) {
        if succeeded {
            out::print_success(&format!("Data now lives under {}", result_path.display()));
        } else {
            out::print_error(&format!("Migration failed; data remains under {}", result_path.display()));
        }
        out::print_user(&result_path.display().to_string());
    }

    fn on_cancelled(&self) {
        out::print_warn("Migration cancelled; nothing was changed.");
    }
}

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default storage_migrate config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run without --print-config to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

/// Load the file config. `None` means the caller should stop (template written
/// and the CLI did not supply enough to run).
fn load_config(args: &Args) -> Result<Option<Config>> {
    let cli_complete = args.source.is_some() && args.target.is_some() && args.user.is_some();
    match load_or_init()? {
        LoadResult::Loaded(cfg, path) => {
            debug!(path = %path.display(), "using config file");
            Ok(Some(cfg))
        }
        LoadResult::Missing(path) => {
            out::print_warn(&format!("{CONFIG_ENV} points at {}, which does not exist; using defaults.", path.display()));
            Ok(Some(Config::default()))
        }
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!("A template storage_migrate config was written to: {}", path.display()));
            if cli_complete {
                return Ok(Some(Config::default()));
            }
            out::print_info("Edit it to set `source_root`, `target_root` and `user` (or pass --source, --target and --user), then re-run.");
            Ok(None)
        }
    }
}

fn ask_existing_choice(target_data: &Path) -> ExistingDataChoice {
    let question = format!(
        "{} already exists. [c]ancel, [u]se the existing data, or [o]verwrite it?",
        target_data.display()
    );
    match out::ask(&question).as_deref() {
        Some("u" | "use" | "use-existing") => ExistingDataChoice::UseExisting,
        Some("o" | "overwrite") => ExistingDataChoice::Overwrite,
        _ => ExistingDataChoice::Cancel,
    }
}

/// Run the CLI application and return the process exit status.
pub fn run(args: Args) -> Result<i32> {
    if args.print_config {
        print_config_location();
        return Ok(0);
    }

    let Some(mut cfg) = load_config(&args)? else {
        return Ok(0);
    };
    args.apply_overrides(&mut cfg);

    let log_guard = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).inspect_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
    })?;

    // The run continues after an interrupt, so the log guard stays alive until
    // it finishes and the file appender keeps every later event.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.request();
            out::print_warn("Received interrupt; no longer waiting for running syncs.");
        })
        .expect("failed to install signal handler");
    }

    let result = execute(&args, &cfg, cancel);

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "storage_migrate failed");
    }
    drop(log_guard);
    result
}

fn execute(args: &Args, cfg: &Config, cancel: CancelToken) -> Result<i32> {
    let request = cfg.request()?;
    let index_file = match &cfg.index_file {
        Some(p) => p.clone(),
        None => default_index_path()?,
    };
    let sync_state_file = match &cfg.sync_state_file {
        Some(p) => p.clone(),
        None => default_sync_state_path()?,
    };
    let lock_dir = match &cfg.lock_dir {
        Some(p) => p.clone(),
        None => default_lock_dir()?,
    };
    debug!(index = %index_file.display(), sync_state = %sync_state_file.display(), locks = %lock_dir.display(), "collaborators");

    let env = MigrationEnv {
        fs: Arc::new(StdFs),
        sync: Arc::new(StateFileSyncProvider::new(sync_state_file)),
        index: Arc::new(JsonFileIndex::new(index_file)),
        listener: Arc::new(ConsoleListener),
    };

    let command = args.command();
    let target_data = request.target_data();
    let mut migration = StorageMigration::new(env, request)
        .lock_dir(lock_dir)
        .cancel_token(cancel)
        .poll_interval(cfg.sync_poll_interval);

    let migrate_args = match command {
        Command::Switch => {
            migration = migration.mode(RunMode::PathSwitch);
            MigrateArgs::default()
        }
        Command::Migrate(m) => {
            let choice = match m.on_existing {
                Some(arg) => Some(arg.into()),
                None if target_data.exists() && out::interactive() => Some(ask_existing_choice(&target_data)),
                None => None,
            };
            if let Some(choice) = choice {
                migration = migration.on_existing_data(choice);
            }
            m
        }
    };

    let outcome = match migration.run_blocking() {
        Ok(outcome) => outcome,
        Err(e) => return front_end_status(e),
    };

    let outcome = match outcome {
        MigrationOutcome::Failure(kind) if kind.is_not_readable() => {
            let switch = migrate_args.switch_if_unreadable
                || (out::interactive() && out::confirm(&format!("{kind}. Switch storage roots without moving data?")));
            if switch {
                info!("falling back to path switch");
                match migration.switch_after_unreadable() {
                    Ok(o) => o,
                    Err(e) => return front_end_status(e),
                }
            } else {
                MigrationOutcome::Failure(kind)
            }
        }
        other => other,
    };

    if let Some(kind) = outcome.failure() {
        out::print_error(&kind.to_string());
    }
    Ok(outcome.code())
}

/// Map errors raised around the run to exit statuses; anything else propagates.
fn front_end_status(e: anyhow::Error) -> Result<i32> {
    match e.downcast_ref::<MigrateError>() {
        Some(MigrateError::Cancelled) => Ok(MigrateError::Cancelled.code()),
        Some(err @ MigrateError::AlreadyRunning(_)) => {
            out::print_error(&err.to_string());
            Ok(err.code())
        }
        _ => Err(e),
    }
}
