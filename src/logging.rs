//! Tracing initialization.
//! Builds a registry with one formatting layer for stderr and, optionally, one
//! for a log file. Both share the verbosity derived from `LogLevel`, and both
//! are compact or JSON depending on `json`.
//!
//! File logging is refused when any ancestor of the log path is a symlink, and
//! goes through tracing_appender::non_blocking so a slow disk never stalls the
//! migration worker.

use anyhow::{anyhow, Result};
use chrono::Local;
use std::fmt as stdfmt;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tsfmt, Layer};

use crate::config::{default_log_path, path_has_symlink_ancestor, LogLevel};
use crate::output as out;
use crate::platform::open_log_file_secure_append;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

pub fn to_level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

fn env_filter(lvl: LogLevel) -> EnvFilter {
    EnvFilter::new(to_level_filter(lvl).to_string().to_ascii_lowercase())
}

fn fmt_layer<W>(lvl: LogLevel, json: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_level(true)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(writer);
    if json {
        base.event_format(tsfmt::format().json().with_timer(LocalHumanTime))
            .with_filter(env_filter(lvl))
            .boxed()
    } else {
        base.compact().with_filter(env_filter(lvl)).boxed()
    }
}

/// Open a non-blocking writer for `path`, or explain on stderr why not.
fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "Refusing to enable file logging: ancestor of {} is a symlink",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("Cannot check log path {} for symlinks: {e}", path.display()));
            return None;
        }
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("Failed to open log file {}: {e}", path.display()));
            None
        }
    }
}

/// Install the global subscriber. The returned guard must be held until exit
/// so buffered file output is flushed.
pub fn init_tracing(lvl: LogLevel, log_file: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(lvl, json, std::io::stderr)];
    let mut guard = None;

    if let Some(path) = log_file {
        match open_file_writer(path) {
            Some((writer, g)) => {
                layers.push(fmt_layer(lvl, json, writer));
                guard = Some(g);
            }
            None => {
                out::print_warn(&format!(
                    "File logging to '{}' is disabled; logs go to stderr only.",
                    path.display()
                ));
                if let Ok(def) = default_log_path() {
                    out::print_info(&format!("The default log path is {}", def.display()));
                }
            }
        }
    }

    registry_init(layers)?;
    Ok(guard)
}

fn registry_init(layers: Vec<BoxedLayer>) -> Result<()> {
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
