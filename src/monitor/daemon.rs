//! The long-running daemon: three periodic loops over shared state.
//!
//! - monitoring (10 min): learning samples, due checkpoints, maintenance
//! - heartbeat (1 min): rewrites `heartbeat.json`
//! - learning (1 h): closes the learning period once it has elapsed
//!
//! The loops share one [`MonitorState`] mutex. The heartbeat loop touches
//! only the heartbeat file, so a slow checkpoint or restoration can never
//! delay it.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::heartbeat::{HeartbeatStore, HEARTBEAT_INTERVAL};
use super::pattern::{OptimizationMetrics, UserActivity, WorkPattern};
use crate::checkpoint::CheckpointManager;
use crate::fs::DataDir;
use crate::platform::SystemProbe;

pub const MONITOR_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const LEARNING_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const MAINTENANCE_EVERY: ChronoDuration = ChronoDuration::hours(6);
/// A graceful shutdown takes a final checkpoint when the last one is this old
pub const FINAL_CHECKPOINT_AGE: ChronoDuration = ChronoDuration::hours(2);
/// Interval extension while working during learned work hours
pub const WORKING_EXTENSION: ChronoDuration = ChronoDuration::minutes(30);
pub const CPU_LOAD_LIMIT: f64 = 70.0;
pub const LOW_BATTERY_PERCENT: u8 = 15;

/// Loop periods, shortened in tests
#[derive(Debug, Clone, Copy)]
pub struct MonitorIntervals {
    pub monitor: Duration,
    pub heartbeat: Duration,
    pub learning: Duration,
}

impl Default for MonitorIntervals {
    fn default() -> Self {
        Self {
            monitor: MONITOR_INTERVAL,
            heartbeat: HEARTBEAT_INTERVAL,
            learning: LEARNING_INTERVAL,
        }
    }
}

/// Cooperative stop flag the loops sleep on.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`; returns true if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// State shared by the loops
#[derive(Debug)]
pub struct MonitorState {
    pub pattern: WorkPattern,
    pub metrics: OptimizationMetrics,
    pub last_checkpoint: Option<DateTime<Utc>>,
}

/// Why a due checkpoint was not taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Paused,
    NotDue,
    ResourcesConstrained,
    IntensiveWork,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Created(String),
    Skipped(SkipReason),
    Failed(String),
}

/// What one monitoring cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub checkpoint: CheckpointOutcome,
    pub maintenance_ran: bool,
}

/// Checkpoint interval for the current moment.
///
/// The base interval applies while learning and outside work hours. Inside
/// learned work hours intensive activity doubles it and regular work adds
/// [`WORKING_EXTENSION`].
pub fn optimal_interval(
    pattern: &WorkPattern,
    now: DateTime<Utc>,
    activity: UserActivity,
    base: ChronoDuration,
) -> ChronoDuration {
    if !pattern.learning_complete || !pattern.is_work_hour(now.hour()) {
        return base;
    }
    match activity {
        UserActivity::Intensive => base * 2,
        UserActivity::Working => base + WORKING_EXTENSION,
        UserActivity::Idle | UserActivity::Light => base,
    }
}

/// False when CPU load or an unplugged low battery argue against writing now.
/// Signals the platform cannot measure never block.
pub fn resources_safe(probe: &dyn SystemProbe) -> bool {
    if let Some(load) = probe.cpu_load() {
        if load > CPU_LOAD_LIMIT {
            tracing::debug!(load, "high CPU load");
            return false;
        }
    }
    if let Some(battery) = probe.battery() {
        if battery.percent <= LOW_BATTERY_PERCENT && !battery.on_ac_power {
            tracing::debug!(percent = battery.percent, "low battery");
            return false;
        }
    }
    true
}

pub struct SystemMonitor {
    data_dir: DataDir,
    manager: Arc<CheckpointManager>,
    probe: Arc<dyn SystemProbe>,
    heartbeat: HeartbeatStore,
    state: Arc<Mutex<MonitorState>>,
    shutdown: ShutdownSignal,
    intervals: MonitorIntervals,
}

impl SystemMonitor {
    pub fn new(data_dir: DataDir, manager: Arc<CheckpointManager>, probe: Arc<dyn SystemProbe>) -> Self {
        let now = Utc::now();
        let pattern = WorkPattern::load_or_new(&data_dir.work_pattern_path(), now);
        let metrics = OptimizationMetrics::load_or_default(&data_dir.metrics_path());
        let last_checkpoint = match manager.get_available_checkpoints() {
            Ok(list) => list.latest().map(|c| c.timestamp),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list checkpoints");
                None
            }
        };

        Self {
            heartbeat: HeartbeatStore::new(&data_dir.heartbeat_path()),
            data_dir,
            manager,
            probe,
            state: Arc::new(Mutex::new(MonitorState {
                pattern,
                metrics,
                last_checkpoint,
            })),
            shutdown: ShutdownSignal::new(),
            intervals: MonitorIntervals::default(),
        }
    }

    pub fn with_intervals(mut self, intervals: MonitorIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn last_checkpoint(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_checkpoint
    }

    /// Run the loops until the shutdown signal fires, then shut down
    /// gracefully.
    pub fn run(&self) {
        tracing::info!(pid = std::process::id(), "monitor started");

        thread::scope(|scope| {
            scope.spawn(|| {
                while !self.shutdown.wait_timeout(self.intervals.heartbeat) {
                    if let Err(e) = self.heartbeat.touch() {
                        tracing::warn!(error = %e, "failed to write heartbeat");
                    }
                }
            });
            scope.spawn(|| {
                while !self.shutdown.wait_timeout(self.intervals.learning) {
                    self.learning_cycle_at(Utc::now());
                }
            });
            scope.spawn(|| {
                while !self.shutdown.wait_timeout(self.intervals.monitor) {
                    self.monitoring_cycle_at(Utc::now());
                }
            });
        });

        self.shutdown_at(Utc::now());
    }

    /// One pass of the monitoring loop.
    pub fn monitoring_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        if self.data_dir.is_paused() {
            tracing::debug!("paused, skipping monitoring cycle");
            return CycleReport {
                checkpoint: CheckpointOutcome::Skipped(SkipReason::Paused),
                maintenance_ran: false,
            };
        }

        let running = self.manager.running_apps();
        let activity =
            UserActivity::from_running_count(running.len(), self.manager.config().active_app_threshold);

        let due = {
            let mut state = self.lock_state();
            state.pattern.record_sample(now, &running);
            if let Err(e) = state.pattern.save(&self.data_dir.work_pattern_path()) {
                tracing::warn!(error = %e, "failed to save work pattern");
            }
            let interval =
                optimal_interval(&state.pattern, now, activity, self.manager.config().checkpoint_interval());
            state.last_checkpoint.is_none_or(|last| now - last >= interval)
        };

        let checkpoint = if !due {
            CheckpointOutcome::Skipped(SkipReason::NotDue)
        } else if !resources_safe(self.probe.as_ref()) {
            tracing::info!("system resources constrained, postponing checkpoint");
            CheckpointOutcome::Skipped(SkipReason::ResourcesConstrained)
        } else if activity == UserActivity::Intensive {
            tracing::info!("intensive work in progress, postponing checkpoint");
            CheckpointOutcome::Skipped(SkipReason::IntensiveWork)
        } else {
            self.take_checkpoint(now)
        };

        let maintenance_due = self
            .lock_state()
            .metrics
            .maintenance_due(now, MAINTENANCE_EVERY);
        if maintenance_due {
            let report = self.manager.perform_maintenance_tasks_at(now);
            if !report.is_clean() {
                tracing::warn!(errors = ?report.errors, "maintenance finished with errors");
            }
            let mut state = self.lock_state();
            state.metrics.last_maintenance = Some(now);
            self.save_metrics(&state.metrics);
        }

        CycleReport {
            checkpoint,
            maintenance_ran: maintenance_due,
        }
    }

    /// One pass of the learning loop.
    pub fn learning_cycle_at(&self, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        if state.pattern.update_learning(now) {
            if let Err(e) = state.pattern.save(&self.data_dir.work_pattern_path()) {
                tracing::warn!(error = %e, "failed to save work pattern");
            }
        }
    }

    /// Final checkpoint when the last one is old enough, then the clean
    /// shutdown heartbeat.
    pub fn shutdown_at(&self, now: DateTime<Utc>) -> Option<String> {
        tracing::info!("monitor shutting down");
        let last = self.lock_state().last_checkpoint;
        let stale = last.is_none_or(|last| now - last >= FINAL_CHECKPOINT_AGE);

        let created = if stale {
            tracing::info!("last checkpoint is old, creating a final one");
            match self.take_checkpoint(now) {
                CheckpointOutcome::Created(id) => Some(id),
                _ => None,
            }
        } else {
            None
        };

        if let Err(e) = self.heartbeat.mark_clean_shutdown() {
            tracing::warn!(error = %e, "failed to write shutdown heartbeat");
        }
        created
    }

    fn take_checkpoint(&self, now: DateTime<Utc>) -> CheckpointOutcome {
        let started = Instant::now();
        match self.manager.create_checkpoint_at(now) {
            Ok(checkpoint) => {
                let mut state = self.lock_state();
                state.last_checkpoint = Some(checkpoint.timestamp);
                state.metrics.record_checkpoint_duration(started.elapsed());
                self.save_metrics(&state.metrics);
                CheckpointOutcome::Created(checkpoint.id)
            }
            Err(e) => {
                tracing::error!(error = %e, "checkpoint failed");
                CheckpointOutcome::Failed(e.to_string())
            }
        }
    }

    fn save_metrics(&self, metrics: &OptimizationMetrics) {
        if let Err(e) = metrics.save(&self.data_dir.metrics_path()) {
            tracing::warn!(error = %e, "failed to save metrics");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
