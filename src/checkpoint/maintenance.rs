//! Periodic housekeeping: disk space check, retention cleanup, compression.

use chrono::{DateTime, Duration, Utc};

use super::CheckpointManager;
use crate::storage::DiskUsage;

/// Used-space percentage above which maintenance warns
pub const DISK_USAGE_WARN_PERCENT: f64 = 75.0;

/// Uncompressed checkpoints this much older than the reference get compressed
pub const COMPRESSION_AGE: Duration = Duration::hours(24);

/// What one maintenance pass did. Sub-task failures are collected in
/// `errors` instead of aborting the pass.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub disk_usage: Option<DiskUsage>,
    pub disk_warning: bool,
    pub deleted: usize,
    pub compressed: Vec<String>,
    pub errors: Vec<String>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl CheckpointManager {
    pub fn perform_maintenance_tasks(&self) -> MaintenanceReport {
        self.perform_maintenance_tasks_at(Utc::now())
    }

    /// Run every maintenance sub-task; never fails.
    pub fn perform_maintenance_tasks_at(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.storage().disk_usage() {
            Ok(usage) => {
                let percent = usage.used_percent();
                if percent > DISK_USAGE_WARN_PERCENT {
                    tracing::warn!(used_percent = percent, "disk space is running low");
                    report.disk_warning = true;
                }
                report.disk_usage = Some(usage);
            }
            Err(e) => {
                tracing::error!(error = %e, "disk space check failed");
                report.errors.push(format!("disk space check: {e}"));
            }
        }

        match self
            .config()
            .retention()
            .and_then(|retention| now.checked_sub_signed(retention))
        {
            Some(cutoff) => match self.storage().clean_old_checkpoints(cutoff) {
                Ok(deleted) => report.deleted = deleted,
                Err(e) => {
                    tracing::error!(error = %e, "retention cleanup failed");
                    report.errors.push(format!("retention cleanup: {e}"));
                }
            },
            None => {
                let days = self.config().retention_days;
                tracing::error!(retention_days = days, "retention period out of range, skipping cleanup");
                report
                    .errors
                    .push(format!("retention cleanup: retention of {days} days is out of range"));
            }
        }

        self.compress_old_checkpoints(&mut report);

        tracing::info!(
            deleted = report.deleted,
            compressed = report.compressed.len(),
            errors = report.errors.len(),
            "maintenance finished"
        );
        report
    }

    /// Compress uncompressed checkpoints more than [`COMPRESSION_AGE`] older
    /// than the reference: the last-used checkpoint, else the newest one.
    fn compress_old_checkpoints(&self, report: &mut MaintenanceReport) {
        let list = match self.get_available_checkpoints() {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "failed to list checkpoints for compression");
                report.errors.push(format!("compression listing: {e}"));
                return;
            }
        };

        let reference = list
            .last_used
            .as_deref()
            .and_then(|id| list.get(id))
            .or_else(|| list.latest())
            .map(|c| c.timestamp);
        let Some(reference) = reference else {
            return;
        };
        let Some(threshold) = reference.checked_sub_signed(COMPRESSION_AGE) else {
            return;
        };

        for checkpoint in list
            .checkpoints
            .iter()
            .filter(|c| !c.is_compressed && c.timestamp < threshold)
        {
            let mut checkpoint = checkpoint.clone();
            match self.storage().compress_checkpoint(&mut checkpoint) {
                Ok(()) => report.compressed.push(checkpoint.id),
                Err(e) => {
                    tracing::warn!(id = %checkpoint.id, error = %e, "compression failed");
                    report
                        .errors
                        .push(format!("compress {}: {e}", checkpoint.id));
                }
            }
        }
    }
}
