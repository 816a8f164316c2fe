//! Wiring shared by the commands: data directory, configuration and the
//! default platform collaborators.

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use crate::checkpoint::CheckpointManager;
use crate::config::Config;
use crate::fs::DataDir;
use crate::models::RestoreOutcome;
use crate::platform::{FileAutoStart, Notifier, PsProcessSource, SystemController};
use crate::startup::StartupManager;
use crate::storage::Storage;

/// Resolve the data directory and create its layout.
pub fn data_dir() -> Result<DataDir> {
    let data_dir = DataDir::from_env().context("Failed to resolve data directory")?;
    data_dir
        .initialize()
        .with_context(|| format!("Failed to create {}", data_dir.root().display()))?;
    Ok(data_dir)
}

pub fn load_config(data_dir: &DataDir) -> Result<Config> {
    Config::load_or_create(&data_dir.config_path()).context("Failed to load configuration")
}

/// Checkpoint manager backed by the host's process table and launcher.
pub fn checkpoint_manager(data_dir: &DataDir, config: Config) -> Result<CheckpointManager> {
    let storage = Storage::new(data_dir);
    storage
        .initialize()
        .context("Failed to initialize checkpoint storage")?;
    let controller = Arc::new(SystemController::new(config.launch_timeout()));
    Ok(CheckpointManager::new(
        storage,
        config,
        Arc::new(PsProcessSource::new()),
        controller,
    ))
}

pub fn startup_manager(data_dir: &DataDir, notifier: Arc<dyn Notifier>) -> Result<StartupManager> {
    let autostart = FileAutoStart::for_current_user()?;
    Ok(StartupManager::new(
        data_dir.clone(),
        Arc::new(autostart),
        notifier,
    ))
}

/// Per-application lines followed by the summary.
pub fn print_restore_outcome(outcome: &RestoreOutcome) {
    println!(
        "{} Restoring from checkpoint {}",
        "→".cyan().bold(),
        outcome.checkpoint_id.bold()
    );
    for name in &outcome.skipped {
        println!("  {} {name} (already running)", "─".dimmed());
    }
    for result in &outcome.results {
        if result.success {
            let pid = result.pid.map(|p| format!(" (PID: {p})")).unwrap_or_default();
            println!("  {} {}{pid}", "✓".green().bold(), result.app_name);
        } else {
            println!(
                "  {} {}: {}",
                "✗".red().bold(),
                result.app_name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    print_restore_summary(outcome);
}

pub fn print_restore_summary(outcome: &RestoreOutcome) {
    println!(
        "{} Restored {} applications",
        "✓".green().bold(),
        outcome.summary.successful
    );
    if outcome.summary.failed > 0 {
        println!(
            "{} {} applications failed to restore: {}",
            "!".yellow().bold(),
            outcome.summary.failed,
            outcome.summary.failed_apps.join(", ")
        );
    }
}
