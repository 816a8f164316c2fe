//! `relaunch enable-autostart` / `relaunch disable-autostart`

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;

use super::common;
use crate::platform::ConsoleNotifier;

/// Turn auto-start back on, also clearing the crash history that may have
/// disabled it.
pub fn enable() -> Result<()> {
    let data_dir = common::data_dir()?;
    let mut startup = common::startup_manager(&data_dir, Arc::new(ConsoleNotifier::new()))?;
    startup.enable_autostart()?;
    println!("{} Auto-start enabled", "✓".green().bold());
    Ok(())
}

pub fn disable() -> Result<()> {
    let data_dir = common::data_dir()?;
    let startup = common::startup_manager(&data_dir, Arc::new(ConsoleNotifier::new()))?;
    startup.disable_autostart()?;
    println!("{} Auto-start disabled", "✓".green().bold());
    Ok(())
}
