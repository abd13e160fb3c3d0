//! Tracing setup: a compact stdout layer plus a JSON log file per day in the
//! configured log directory. `RUST_LOG` controls filtering (default `info`).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::util::today_slug;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("leadsweep_{}.log", today_slug()))
}

/// Stdout-only logging, used before the config (and its log directory) is known.
pub fn init_stdout_logging() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_filter(env_filter()))
        .try_init();
}

/// Stdout plus an appending JSON file under `log_dir`.
///
/// Returns the log file path. Fails if a global subscriber is already set.
pub fn init_logging(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;
    let path = log_file_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let file_layer = fmt::layer()
        .json()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(env_filter());

    let stdout_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("global tracing subscriber already installed")?;

    Ok(path)
}
