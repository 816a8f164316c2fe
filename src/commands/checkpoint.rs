//! `relaunch checkpoint [--force]`

use anyhow::{Context, Result};
use colored::Colorize;

use super::common;
use crate::monitor::daemon::resources_safe;
use crate::platform::HostProbe;

/// Create a checkpoint now. Without `force` the pause marker and resource
/// limits are honoured.
pub fn execute(force: bool) -> Result<()> {
    let data_dir = common::data_dir()?;

    if !force {
        if data_dir.is_paused() {
            println!(
                "{} Checkpoints are paused. Use {} to create one anyway",
                "─".dimmed(),
                "--force".cyan()
            );
            return Ok(());
        }
        if !resources_safe(&HostProbe::new()) {
            println!(
                "{} System is busy or on low battery. Use {} to create one anyway",
                "─".dimmed(),
                "--force".cyan()
            );
            return Ok(());
        }
    }

    let config = common::load_config(&data_dir)?;
    let manager = common::checkpoint_manager(&data_dir, config)?;
    let checkpoint = manager
        .create_checkpoint()
        .context("Checkpoint creation failed")?;

    println!("{} Checkpoint created: {}", "✓".green().bold(), checkpoint.id.bold());
    println!("  Applications saved: {}", checkpoint.app_count());
    println!("  Size: {} bytes", checkpoint.file_size);
    for name in &checkpoint.app_names {
        println!("  {} {name}", "→".dimmed());
    }
    Ok(())
}
