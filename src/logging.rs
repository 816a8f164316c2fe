//! File logging setup.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directives
pub const LOG_ENV: &str = "RELAUNCH_LOG";
const DEFAULT_FILTER: &str = "info";

/// Daily log file inside `logs_dir`
pub fn log_file_path(logs_dir: &Path, now: DateTime<Local>) -> PathBuf {
    logs_dir.join(format!("relaunch-{}.log", now.format("%Y-%m-%d")))
}

/// Route `tracing` output to today's log file.
///
/// Calling this twice keeps the first subscriber.
pub fn init(logs_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory: {}", logs_dir.display()))?;
    let path = log_file_path(logs_dir, Local::now());
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .try_init();
    Ok(path)
}
