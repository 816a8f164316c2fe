//! Relaunching the applications recorded in a checkpoint.
//!
//! Applications are started one at a time, largest memory footprint first,
//! so heavyweight apps get resources before the desktop fills up. Each
//! launch is retried a bounded number of times and verified with an
//! independent process lookup. A failed application never aborts the run.

mod policy;


use anyhow::anyhow;
use chrono::Utc;
use std::sync::Arc;
use std::thread;

use crate::models::{sort_by_memory_desc, LaunchResult, LaunchSummary, ProcessRecord, WindowState};
use crate::platform::AppController;

pub use policy::LaunchPolicy;

pub struct ApplicationLauncher {
    controller: Arc<dyn AppController>,
    policy: LaunchPolicy,
    results: Vec<LaunchResult>,
}

impl ApplicationLauncher {
    pub fn new(controller: Arc<dyn AppController>, policy: LaunchPolicy) -> Self {
        Self {
            controller,
            policy,
            results: Vec::new(),
        }
    }

    pub fn policy(&self) -> &LaunchPolicy {
        &self.policy
    }

    /// Results of the most recent restoration, in launch order
    pub fn results(&self) -> &[LaunchResult] {
        &self.results
    }

    /// Relaunch every recorded application that is not already running.
    ///
    /// Returns the names of the applications skipped because they were
    /// running; the launch results are available through [`Self::results`].
    pub fn restore_applications(&mut self, processes: &[ProcessRecord]) -> Vec<String> {
        self.results.clear();
        let mut skipped = Vec::new();

        for record in sort_by_memory_desc(processes) {
            if let Some(pid) = self.controller.find_process(&record.process_name) {
                tracing::info!(app = %record.name, pid, "already running, skipping");
                skipped.push(record.name.clone());
                continue;
            }

            let result = self.launch_with_retry(&record);
            let success = result.success;
            self.results.push(result);

            if success {
                self.apply_window_state(&record);
                if !self.policy.launch_delay.is_zero() {
                    thread::sleep(self.policy.launch_delay);
                }
            }
        }

        let summary = self.launch_summary();
        tracing::info!(
            successful = summary.successful,
            failed = summary.failed,
            skipped = skipped.len(),
            "restoration finished"
        );
        skipped
    }

    /// Launch one application, retrying up to the policy's attempt limit.
    pub fn launch_with_retry(&self, record: &ProcessRecord) -> LaunchResult {
        let started = Utc::now();
        let max_attempts = self.policy.max_retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.launch_once(record) {
                Ok(pid) => {
                    tracing::info!(app = %record.name, pid, attempt, "launched");
                    let mut result = LaunchResult::succeeded(&record.name, pid, started);
                    result.retry_count = attempt;
                    return result;
                }
                Err(e) => {
                    tracing::warn!(
                        app = %record.name,
                        attempt,
                        max_attempts,
                        error = %e,
                        "launch attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        thread::sleep(self.policy.retry_delay);
                    }
                }
            }
        }

        let mut result = LaunchResult::failed(
            &record.name,
            started,
            format!("Failed after {max_attempts} attempts: {last_error}"),
        );
        result.retry_count = max_attempts;
        result
    }

    /// Single attempt: activate, wait for the app to settle, then look it up.
    pub fn launch_once(&self, record: &ProcessRecord) -> anyhow::Result<u32> {
        self.controller.open_application(&record.process_name)?;
        if !self.policy.settle_delay.is_zero() {
            thread::sleep(self.policy.settle_delay);
        }
        self.controller
            .find_process(&record.process_name)
            .ok_or_else(|| anyhow!("process not found after launch"))
    }

    pub fn launch_summary(&self) -> LaunchSummary {
        LaunchSummary::from_results(&self.results)
    }

    fn apply_window_state(&self, record: &ProcessRecord) {
        if record.window_state == WindowState::Normal {
            return;
        }
        if let Err(e) = self
            .controller
            .set_window_state(&record.process_name, record.window_state)
        {
            tracing::warn!(
                app = %record.name,
                state = %record.window_state,
                error = %e,
                "failed to restore window state"
            );
        }
    }
}
