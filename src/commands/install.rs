//! `relaunch install` / `relaunch uninstall`

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use super::common;
use crate::platform::ConsoleNotifier;

/// Register relaunch to start at login and write the default configuration.
pub fn install() -> Result<()> {
    let data_dir = common::data_dir()?;
    let config = common::load_config(&data_dir)?;
    let startup = common::startup_manager(&data_dir, Arc::new(ConsoleNotifier::new()))?;
    let executable = std::env::current_exe().context("Failed to locate executable")?;

    if startup.install(&executable)? {
        println!("{} Auto-start configured", "✓".green().bold());
        println!("{} Will start automatically at login", "✓".green().bold());
    } else {
        println!("{} Auto-start already installed", "─".dimmed());
    }
    println!("  Data directory: {}", data_dir.root().display());
    println!(
        "  Monitoring {} applications",
        config.enabled_applications().len()
    );
    Ok(())
}

pub fn uninstall() -> Result<()> {
    let data_dir = common::data_dir()?;
    let startup = common::startup_manager(&data_dir, Arc::new(ConsoleNotifier::new()))?;

    if startup.uninstall()? {
        println!("{} Auto-start removed", "✓".green().bold());
    } else {
        println!("{} Auto-start not installed", "─".dimmed());
    }
    println!(
        "  Checkpoints are kept in {}",
        data_dir.root().display()
    );
    Ok(())
}
