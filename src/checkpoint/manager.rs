use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::launcher::{ApplicationLauncher, LaunchPolicy};
use crate::models::{Checkpoint, CheckpointList, ProcessRecord, RestoreOutcome};
use crate::platform::{AppController, ProcessSource};
use crate::storage::Storage;

/// Owns storage and the process source; the unit every checkpoint operation
/// goes through.
pub struct CheckpointManager {
    storage: Storage,
    config: Config,
    source: Arc<dyn ProcessSource>,
    controller: Arc<dyn AppController>,
    launch_policy: LaunchPolicy,
}

impl CheckpointManager {
    pub fn new(
        storage: Storage,
        config: Config,
        source: Arc<dyn ProcessSource>,
        controller: Arc<dyn AppController>,
    ) -> Self {
        let launch_policy = LaunchPolicy::from_config(&config);
        Self {
            storage,
            config,
            source,
            controller,
            launch_policy,
        }
    }

    pub fn with_launch_policy(mut self, policy: LaunchPolicy) -> Self {
        self.launch_policy = policy;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enabled applications that are running right now
    pub fn running_apps(&self) -> Vec<ProcessRecord> {
        self.source
            .running_apps(&self.config.enabled_applications())
    }

    pub fn create_checkpoint(&self) -> Result<Checkpoint> {
        self.create_checkpoint_at(Utc::now())
    }

    /// Snapshot the enabled applications as of `now`.
    ///
    /// Nothing running still yields a (empty) checkpoint. Two checkpoints in
    /// the same second share an id, so the second fails with
    /// [`Error::IdCollision`].
    pub fn create_checkpoint_at(&self, now: DateTime<Utc>) -> Result<Checkpoint> {
        let now = now.with_nanosecond(0).unwrap_or(now);
        let processes = self.running_apps();
        if processes.is_empty() {
            tracing::warn!("no monitored applications running, saving empty checkpoint");
        }

        let mut checkpoint = Checkpoint::new(now, processes);
        self.storage.save_checkpoint(&mut checkpoint)?;
        tracing::info!(
            id = %checkpoint.id,
            apps = ?checkpoint.app_names,
            "checkpoint created"
        );
        Ok(checkpoint)
    }

    pub fn get_available_checkpoints(&self) -> Result<CheckpointList> {
        let checkpoints = self.storage.load_all_checkpoints()?;
        Ok(CheckpointList::new(checkpoints, self.storage.last_used()))
    }

    /// Relaunch the applications of one checkpoint.
    ///
    /// Individual launch failures are reported in the outcome, not as an
    /// error.
    pub fn restore_from_checkpoint(&self, id: &str) -> Result<RestoreOutcome> {
        let checkpoint = self.storage.load_checkpoint(id)?;
        if let Err(e) = self.storage.record_last_used(id) {
            tracing::warn!(%id, error = %e, "failed to record last used checkpoint");
        }

        tracing::info!(%id, apps = checkpoint.processes.len(), "restoring checkpoint");
        let mut launcher =
            ApplicationLauncher::new(self.controller.clone(), self.launch_policy.clone());
        let skipped = launcher.restore_applications(&checkpoint.processes);

        Ok(RestoreOutcome {
            checkpoint_id: checkpoint.id,
            summary: launcher.launch_summary(),
            results: launcher.results().to_vec(),
            skipped,
        })
    }

    pub fn restore_latest_checkpoint(&self) -> Result<RestoreOutcome> {
        let list = self.get_available_checkpoints()?;
        let latest = list.latest().ok_or(Error::NoCheckpoints)?;
        self.restore_from_checkpoint(&latest.id)
    }
}

/// Display label: `"<id> (app, app)"`, or `"<id> (No applications)"`.
pub fn format_checkpoint_name(checkpoint: &Checkpoint) -> String {
    if checkpoint.app_names.is_empty() {
        format!("{} (No applications)", checkpoint.id)
    } else {
        format!("{} ({})", checkpoint.id, checkpoint.app_names.join(", "))
    }
}
