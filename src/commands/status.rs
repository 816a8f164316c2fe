//! `relaunch status`

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use colored::Colorize;
use std::sync::Arc;

use super::common;
use crate::monitor::{Heartbeat, HeartbeatReading, HeartbeatStore, OptimizationMetrics, WorkPattern};
use crate::platform::ConsoleNotifier;
use crate::process::is_process_alive;

/// Applications listed for the latest checkpoint before eliding
const MAX_LISTED_APPS: usize = 10;

pub fn execute() -> Result<()> {
    let data_dir = common::data_dir()?;
    let config = common::load_config(&data_dir)?;
    let startup = common::startup_manager(&data_dir, Arc::new(ConsoleNotifier::new()))?;
    let running_pid = data_dir.recorded_pid().filter(|pid| is_process_alive(*pid));
    let interval = config.checkpoint_interval_mins;
    let base_interval = config.checkpoint_interval();
    let retention = config.retention_days;
    let manager = common::checkpoint_manager(&data_dir, config)?;
    let list = manager
        .get_available_checkpoints()
        .context("Failed to list checkpoints")?;

    println!("{}", "relaunch status".bold().blue());
    println!("{}", "=".repeat(40));

    match running_pid {
        Some(pid) => println!("Running:    {} (PID: {pid})", "yes".green()),
        None => println!("Running:    {}", "no".red()),
    }
    let autostart = if startup.autostart_enabled() {
        "enabled".green()
    } else if startup.autostart_installed() {
        "disabled".yellow()
    } else {
        "not installed".dimmed()
    };
    println!("Auto-start: {autostart}");
    let state = if data_dir.is_paused() {
        "paused".yellow()
    } else if running_pid.is_some() {
        "monitoring".green()
    } else {
        "stopped".red()
    };
    println!("State:      {state}");

    if let HeartbeatReading::Present(heartbeat) = HeartbeatStore::new(&data_dir.heartbeat_path()).read() {
        println!("Heartbeat:  {}m ago", minutes_since(&heartbeat, Utc::now()));
    }

    println!("\n{}", "Checkpoints".bold());
    println!("  Total:      {} ({} compressed)", list.total_count, list.compressed_count);
    match list.latest() {
        Some(latest) => {
            println!("  Latest:     {}", latest.id.bold());
            println!(
                "  Created:    {}",
                latest.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Apps:       {}", latest.app_count());
            for (i, name) in latest.app_names.iter().enumerate() {
                if i >= MAX_LISTED_APPS {
                    println!("    ... and {} more", latest.app_names.len() - MAX_LISTED_APPS);
                    break;
                }
                println!("    - {name}");
            }
            if running_pid.is_some() {
                let next = latest.timestamp + base_interval;
                let until = next - Utc::now();
                if until > Duration::zero() {
                    println!("  Next in:    {}m", until.num_minutes());
                } else {
                    println!("  Next:       overdue");
                }
            }
        }
        None => println!("  {}", "No checkpoints yet".dimmed()),
    }

    let pattern = WorkPattern::load_or_new(&data_dir.work_pattern_path(), Utc::now());
    let metrics = OptimizationMetrics::load_or_default(&data_dir.metrics_path());
    println!("\n{}", "Learning".bold());
    if pattern.learning_complete {
        println!(
            "  Work hours: {:02}:00-{:02}:59",
            pattern.work_start_hour, pattern.work_end_hour
        );
        println!("  Top apps:   {}", pattern.top_apps.join(", "));
    } else {
        println!(
            "  In progress since {}",
            pattern.learning_started.with_timezone(&Local).format("%Y-%m-%d")
        );
    }
    if let Some(avg) = metrics.average_checkpoint_ms() {
        println!("  Avg checkpoint: {avg} ms");
    }
    println!(
        "  Restore success: {:.0}%",
        metrics.restore_success_rate * 100.0
    );

    println!("\n{}", "Configuration".bold());
    println!("  Checkpoint interval: {interval} min");
    println!("  Data retention:      {retention} days");
    Ok(())
}

/// Whole minutes since the heartbeat was written
fn minutes_since(heartbeat: &Heartbeat, now: DateTime<Utc>) -> u64 {
    heartbeat.gap(now).as_secs() / 60
}
