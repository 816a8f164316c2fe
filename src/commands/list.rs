//! `relaunch list`

use anyhow::{Context, Result};
use colored::Colorize;

use super::common;
use crate::checkpoint::format_checkpoint_name;
use crate::models::CheckpointList;

pub fn execute() -> Result<()> {
    let data_dir = common::data_dir()?;
    let config = common::load_config(&data_dir)?;
    let manager = common::checkpoint_manager(&data_dir, config)?;
    let list = manager
        .get_available_checkpoints()
        .context("Failed to list checkpoints")?;
    print_list(&list);
    Ok(())
}

fn print_list(list: &CheckpointList) {
    if list.is_empty() {
        println!("{} No checkpoints yet", "─".dimmed());
        return;
    }

    println!(
        "{} ({} total, {} compressed)",
        "Checkpoints".bold(),
        list.total_count,
        list.compressed_count
    );
    for checkpoint in &list.checkpoints {
        let marker = if list.last_used.as_deref() == Some(checkpoint.id.as_str()) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        let compressed = if checkpoint.is_compressed {
            " [zst]".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{marker} {}  {} bytes{compressed}",
            format_checkpoint_name(checkpoint),
            checkpoint.file_size
        );
    }
}
