//! `relaunch pause` / `relaunch resume`

use anyhow::{Context, Result};
use colored::Colorize;

use super::common;

/// Suspend automatic checkpoints until [`resume`].
pub fn pause() -> Result<()> {
    let data_dir = common::data_dir()?;
    if data_dir.is_paused() {
        println!("{} Monitoring is already paused", "─".dimmed());
        return Ok(());
    }
    data_dir.set_paused(true).context("Failed to write pause marker")?;
    tracing::info!("monitoring paused");
    println!("{} Monitoring paused", "✓".green().bold());
    println!("  {}  Resume checkpoints", "relaunch resume".cyan());
    Ok(())
}

pub fn resume() -> Result<()> {
    let data_dir = common::data_dir()?;
    if !data_dir.is_paused() {
        println!("{} Monitoring is not paused", "─".dimmed());
        return Ok(());
    }
    data_dir.set_paused(false).context("Failed to remove pause marker")?;
    tracing::info!("monitoring resumed");
    println!("{} Monitoring resumed", "✓".green().bold());
    Ok(())
}
