//! `relaunch maintain`

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use super::common;
use crate::monitor::OptimizationMetrics;

/// Run retention cleanup, compression and the disk check now.
pub fn execute() -> Result<()> {
    let data_dir = common::data_dir()?;
    let config = common::load_config(&data_dir)?;
    let manager = common::checkpoint_manager(&data_dir, config)?;

    let now = Utc::now();
    let report = manager.perform_maintenance_tasks_at(now);

    let metrics_path = data_dir.metrics_path();
    let mut metrics = OptimizationMetrics::load_or_default(&metrics_path);
    metrics.last_maintenance = Some(now);
    if let Err(e) = metrics.save(&metrics_path) {
        tracing::warn!(error = %e, "failed to save metrics");
    }

    if let Some(usage) = &report.disk_usage {
        let line = format!("Disk usage: {:.1}%", usage.used_percent());
        if report.disk_warning {
            println!("{} {line}", "!".yellow().bold());
        } else {
            println!("{} {line}", "✓".green().bold());
        }
    }
    println!("{} Deleted {} old checkpoints", "✓".green().bold(), report.deleted);
    println!("{} Compressed {} checkpoints", "✓".green().bold(), report.compressed.len());
    for error in &report.errors {
        println!("{} {error}", "✗".red().bold());
    }
    Ok(())
}
