//! Learned usage statistics and daemon metrics.
//!
//! During the first [`LEARNING_PERIOD`] the daemon samples which monitored
//! apps run at which hour. Afterwards the learned work hours and activity
//! level stretch the checkpoint interval while the user is busy.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::Path;

use crate::fs::{locked_read, locked_write};
use crate::models::{LaunchSummary, ProcessRecord};

pub const LEARNING_PERIOD: Duration = Duration::days(30);
pub const TOP_APP_COUNT: usize = 3;
pub const DEFAULT_WORK_START_HOUR: u32 = 21;
pub const DEFAULT_WORK_END_HOUR: u32 = 5;
/// Checkpoint durations kept in the metrics file
pub const MAX_DURATION_SAMPLES: usize = 100;

/// Coarse activity level derived from the number of running monitored apps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserActivity {
    Idle,
    Light,
    Working,
    Intensive,
}

impl UserActivity {
    /// 0 apps idle, 1 light, up to `threshold` working, beyond it intensive.
    pub fn from_running_count(count: usize, threshold: usize) -> Self {
        match count {
            0 => UserActivity::Idle,
            1 => UserActivity::Light,
            n if n <= threshold => UserActivity::Working,
            _ => UserActivity::Intensive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPattern {
    pub learning_started: DateTime<Utc>,
    #[serde(default)]
    pub learning_complete: bool,
    /// First hour (UTC, inclusive) of the work period
    pub work_start_hour: u32,
    /// Last hour (UTC, inclusive); may wrap past midnight
    pub work_end_hour: u32,
    /// Hour of day -> samples in which any monitored app was running
    #[serde(default)]
    pub hourly_activity: BTreeMap<u32, u64>,
    /// App name -> samples in which it was running
    #[serde(default)]
    pub app_usage: BTreeMap<String, u64>,
    #[serde(default)]
    pub top_apps: Vec<String>,
}

impl WorkPattern {
    pub fn new(learning_started: DateTime<Utc>) -> Self {
        Self {
            learning_started,
            learning_complete: false,
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            hourly_activity: BTreeMap::new(),
            app_usage: BTreeMap::new(),
            top_apps: Vec::new(),
        }
    }

    /// Load the stored pattern, starting a new learning period when there
    /// is none or it cannot be parsed.
    pub fn load_or_new(path: &Path, now: DateTime<Utc>) -> Self {
        match locked_read(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "work pattern unreadable, restarting learning");
                Self::new(now)
            }),
            Err(_) => {
                tracing::info!("starting work pattern learning");
                Self::new(now)
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        locked_write(path, &json)
    }

    /// Count one observation of the running monitored apps.
    pub fn record_sample(&mut self, now: DateTime<Utc>, running: &[ProcessRecord]) {
        if self.learning_complete {
            return;
        }
        for record in running {
            *self.app_usage.entry(record.name.clone()).or_default() += 1;
        }
        if !running.is_empty() {
            *self.hourly_activity.entry(now.hour()).or_default() += 1;
        }
    }

    /// Finish learning once the period has elapsed. Returns true on the call
    /// that completes it.
    pub fn update_learning(&mut self, now: DateTime<Utc>) -> bool {
        if self.learning_complete || now - self.learning_started < LEARNING_PERIOD {
            return false;
        }

        self.top_apps = self.compute_top_apps();
        if let Some((start, end)) = self.busiest_hours() {
            self.work_start_hour = start;
            self.work_end_hour = end;
        }
        self.learning_complete = true;
        tracing::info!(
            top_apps = ?self.top_apps,
            work_start = self.work_start_hour,
            work_end = self.work_end_hour,
            "learning period complete"
        );
        true
    }

    /// Inclusive on both ends; a start after the end wraps past midnight.
    pub fn is_work_hour(&self, hour: u32) -> bool {
        if self.work_start_hour <= self.work_end_hour {
            hour >= self.work_start_hour && hour <= self.work_end_hour
        } else {
            hour >= self.work_start_hour || hour <= self.work_end_hour
        }
    }

    /// Most used apps, ties broken by name
    fn compute_top_apps(&self) -> Vec<String> {
        let mut usage: Vec<_> = self.app_usage.iter().collect();
        usage.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        usage
            .into_iter()
            .take(TOP_APP_COUNT)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Longest run of consecutive hours (wrapping at midnight) whose activity
    /// is at least the mean of the active hours.
    fn busiest_hours(&self) -> Option<(u32, u32)> {
        let active: Vec<u64> = self.hourly_activity.values().copied().filter(|c| *c > 0).collect();
        if active.is_empty() {
            return None;
        }
        let mean = active.iter().sum::<u64>() as f64 / active.len() as f64;
        let busy: Vec<bool> = (0..24)
            .map(|h| self.hourly_activity.get(&h).copied().unwrap_or(0) as f64 >= mean)
            .collect();
        if busy.iter().all(|b| *b) {
            return Some((0, 23));
        }

        let mut best: Option<(u32, u32)> = None;
        let mut best_len = 0;
        for start in 0..24usize {
            // only start at the beginning of a run
            if !busy[start] || busy[(start + 23) % 24] {
                continue;
            }
            let len = (0..24).take_while(|i| busy[(start + i) % 24]).count();
            if len > best_len {
                best_len = len;
                best = Some((start as u32, ((start + len - 1) % 24) as u32));
            }
        }
        best
    }
}

/// Running statistics about checkpoints and restorations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    /// Recent checkpoint durations in milliseconds, oldest first
    #[serde(default)]
    pub checkpoint_durations_ms: VecDeque<u64>,
    pub restore_success_rate: f64,
    #[serde(default)]
    pub last_maintenance: Option<DateTime<Utc>>,
}

impl Default for OptimizationMetrics {
    fn default() -> Self {
        Self {
            checkpoint_durations_ms: VecDeque::new(),
            restore_success_rate: 1.0,
            last_maintenance: None,
        }
    }
}

impl OptimizationMetrics {
    pub fn load_or_default(path: &Path) -> Self {
        locked_read(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        locked_write(path, &json)
    }

    pub fn record_checkpoint_duration(&mut self, duration: std::time::Duration) {
        self.checkpoint_durations_ms
            .push_back(duration.as_millis().min(u64::MAX as u128) as u64);
        while self.checkpoint_durations_ms.len() > MAX_DURATION_SAMPLES {
            self.checkpoint_durations_ms.pop_front();
        }
    }

    pub fn average_checkpoint_ms(&self) -> Option<u64> {
        let count = self.checkpoint_durations_ms.len() as u64;
        (count > 0).then(|| self.checkpoint_durations_ms.iter().sum::<u64>() / count)
    }

    /// Fold a restoration into the success rate. Runs that launched nothing
    /// leave it unchanged.
    pub fn record_restore(&mut self, summary: &LaunchSummary) {
        if let Some(rate) = summary.success_rate() {
            self.restore_success_rate = rate;
        }
    }

    pub fn maintenance_due(&self, now: DateTime<Utc>, every: Duration) -> bool {
        self.last_maintenance.is_none_or(|last| now - last > every)
    }
}
