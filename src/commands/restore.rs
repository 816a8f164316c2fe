//! `relaunch restore [--silent] [--checkpoint ID]`

use anyhow::{Context, Result};

use super::common;
use crate::monitor::OptimizationMetrics;

/// Relaunch the applications of one checkpoint, the latest by default.
///
/// Applications that fail to launch are reported but do not fail the
/// command.
pub fn execute(checkpoint: Option<String>, silent: bool) -> Result<()> {
    let data_dir = common::data_dir()?;
    let config = common::load_config(&data_dir)?;
    let manager = common::checkpoint_manager(&data_dir, config)?;

    let outcome = match checkpoint.as_deref() {
        Some(id) => manager.restore_from_checkpoint(id),
        None => manager.restore_latest_checkpoint(),
    }
    .context("Restoration failed")?;

    let metrics_path = data_dir.metrics_path();
    let mut metrics = OptimizationMetrics::load_or_default(&metrics_path);
    metrics.record_restore(&outcome.summary);
    if let Err(e) = metrics.save(&metrics_path) {
        tracing::warn!(error = %e, "failed to save metrics");
    }

    if silent {
        common::print_restore_summary(&outcome);
    } else {
        common::print_restore_outcome(&outcome);
    }
    Ok(())
}
