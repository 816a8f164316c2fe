//! Start-up state detection.
//!
//! Compares the last heartbeat with the OS uptime to decide what happened
//! while the daemon was not running, and maps that to the one action the
//! start-up path takes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::crash::CrashTracker;
use super::heartbeat::{HeartbeatReading, HeartbeatStore};
use crate::checkpoint::CheckpointManager;
use crate::error::Result;
use crate::models::RestoreOutcome;
use crate::platform::SystemProbe;

/// Gap beyond which an intact uptime means the machine slept
pub const SLEEP_GAP: Duration = Duration::from_secs(2 * 60 * 60);

/// Gap beyond which a dead daemon PID counts as a crash
pub const CRASH_GAP: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    FirstRun,
    Normal,
    Sleep,
    Restart,
    Crash,
    Unknown,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemState::FirstRun => "first run",
            SystemState::Normal => "normal",
            SystemState::Sleep => "sleep",
            SystemState::Restart => "restart",
            SystemState::Crash => "crash",
            SystemState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupAction {
    CreateInitialCheckpoint,
    RestoreLatest,
    /// Record the crash, then restore; apps that survived are skipped
    RecoverFromCrash,
    RefreshHeartbeat,
}

impl SystemState {
    pub fn startup_action(self) -> StartupAction {
        match self {
            SystemState::FirstRun => StartupAction::CreateInitialCheckpoint,
            SystemState::Restart => StartupAction::RestoreLatest,
            SystemState::Crash => StartupAction::RecoverFromCrash,
            SystemState::Sleep | SystemState::Normal | SystemState::Unknown => {
                StartupAction::RefreshHeartbeat
            }
        }
    }
}

/// Pure classification of the start-up situation.
///
/// Rules, first match wins:
/// 1. no heartbeat: first run
/// 2. unreadable heartbeat: restart
/// 3. uptime unavailable: unknown
/// 4. uptime shorter than the heartbeat gap: restart
/// 5. gap over [`SLEEP_GAP`] with uptime covering it: sleep
/// 6. recorded PID dead after more than [`CRASH_GAP`], without a clean
///    shutdown marker: crash
/// 7. otherwise normal
pub fn classify(
    heartbeat: &HeartbeatReading,
    uptime: Option<Duration>,
    now: DateTime<Utc>,
    is_alive: impl Fn(u32) -> bool,
) -> SystemState {
    let heartbeat = match heartbeat {
        HeartbeatReading::Missing => return SystemState::FirstRun,
        HeartbeatReading::Unreadable(_) => return SystemState::Restart,
        HeartbeatReading::Present(heartbeat) => heartbeat,
    };
    let Some(uptime) = uptime else {
        return SystemState::Unknown;
    };

    let gap = heartbeat.gap(now);
    if uptime < gap {
        return SystemState::Restart;
    }
    if gap > SLEEP_GAP && uptime > gap {
        return SystemState::Sleep;
    }
    if !heartbeat.clean_shutdown && gap > CRASH_GAP && !is_alive(heartbeat.pid) {
        return SystemState::Crash;
    }
    SystemState::Normal
}

/// What the start-up action did
#[derive(Debug)]
pub enum ActionReport {
    CheckpointCreated(String),
    Restored(RestoreOutcome),
    /// Restart detected with auto-restore turned off
    RestoreSkipped,
    HeartbeatRefreshed,
}

/// A detected state with the result of its action. A failed action never
/// changes the state.
#[derive(Debug)]
pub struct HandledState {
    pub state: SystemState,
    pub action: StartupAction,
    pub result: Result<ActionReport>,
}

pub struct SystemStateDetector {
    heartbeat: HeartbeatStore,
    probe: Arc<dyn SystemProbe>,
}

impl SystemStateDetector {
    pub fn new(heartbeat: HeartbeatStore, probe: Arc<dyn SystemProbe>) -> Self {
        Self { heartbeat, probe }
    }

    pub fn detect(&self) -> SystemState {
        self.detect_at(Utc::now())
    }

    pub fn detect_at(&self, now: DateTime<Utc>) -> SystemState {
        let reading = self.heartbeat.read();
        if let HeartbeatReading::Unreadable(reason) = &reading {
            tracing::warn!(%reason, "heartbeat unreadable, assuming restart");
        }
        let uptime = self.probe.uptime();
        if uptime.is_none() {
            tracing::warn!("system uptime unavailable");
        }

        let state = classify(&reading, uptime, now, |pid| self.probe.is_process_alive(pid));
        tracing::info!(%state, "system state detected");
        state
    }

    /// Run the action for `state`, then refresh the heartbeat.
    pub fn handle_state(
        &self,
        state: SystemState,
        manager: &CheckpointManager,
        crashes: &mut CrashTracker,
    ) -> HandledState {
        let action = state.startup_action();
        let result = match action {
            StartupAction::CreateInitialCheckpoint => manager
                .create_checkpoint()
                .map(|c| ActionReport::CheckpointCreated(c.id)),
            StartupAction::RestoreLatest if manager.config().auto_restore => manager
                .restore_latest_checkpoint()
                .map(ActionReport::Restored),
            StartupAction::RestoreLatest => {
                tracing::info!("auto-restore disabled, not restoring");
                Ok(ActionReport::RestoreSkipped)
            }
            StartupAction::RecoverFromCrash => {
                if let Err(e) = crashes.record_crash() {
                    tracing::warn!(error = %e, "failed to record crash");
                }
                manager
                    .restore_latest_checkpoint()
                    .map(ActionReport::Restored)
            }
            StartupAction::RefreshHeartbeat => Ok(ActionReport::HeartbeatRefreshed),
        };

        if let Err(e) = &result {
            tracing::error!(%state, error = %e, "start-up action failed");
        }
        if let Err(e) = self.heartbeat.touch() {
            tracing::warn!(error = %e, "failed to write heartbeat");
        }

        HandledState {
            state,
            action,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::heartbeat::Heartbeat;
    use chrono::Duration as ChronoDuration;

    const HOUR: u64 = 3600;

    fn present(now: DateTime<Utc>, gap_secs: i64, pid: u32) -> HeartbeatReading {
        HeartbeatReading::Present(Heartbeat::at(now - ChronoDuration::seconds(gap_secs), pid))
    }

    fn secs(s: u64) -> Option<Duration> {
        Some(Duration::from_secs(s))
    }

    #[test]
    fn test_missing_heartbeat_is_first_run() {
        let state = classify(&HeartbeatReading::Missing, secs(10), Utc::now(), |_| true);
        assert_eq!(state, SystemState::FirstRun);
    }

    #[test]
    fn test_unreadable_heartbeat_is_restart() {
        let reading = HeartbeatReading::Unreadable("bad json".into());
        assert_eq!(classify(&reading, secs(10), Utc::now(), |_| true), SystemState::Restart);
    }

    #[test]
    fn test_uptime_unavailable_is_unknown() {
        let now = Utc::now();
        assert_eq!(classify(&present(now, 60, 1), None, now, |_| true), SystemState::Unknown);
    }

    #[test]
    fn test_uptime_shorter_than_gap_is_restart() {
        let now = Utc::now();
        let state = classify(&present(now, 3 * 3600, 1), secs(1800), now, |_| false);
        assert_eq!(state, SystemState::Restart);
    }

    #[test]
    fn test_long_gap_with_uptime_is_sleep() {
        let now = Utc::now();
        let state = classify(&present(now, 3 * 3600, 1), secs(10 * HOUR), now, |_| false);
        assert_eq!(state, SystemState::Sleep);
    }

    #[test]
    fn test_half_hour_uptime_after_two_hour_gap_is_restart() {
        let now = Utc::now();
        let state = classify(&present(now, 2 * 3600, 1), secs(30 * 60), now, |_| true);
        assert_eq!(state, SystemState::Restart);
    }

    #[test]
    fn test_three_hour_gap_within_five_hour_uptime_is_sleep() {
        let now = Utc::now();
        let state = classify(&present(now, 3 * 3600, 1), secs(5 * HOUR), now, |_| false);
        assert_eq!(state, SystemState::Sleep);
    }

    #[test]
    fn test_dead_pid_after_gap_is_crash() {
        let now = Utc::now();
        let state = classify(&present(now, 10 * 60, 4242), secs(5 * HOUR), now, |_| false);
        assert_eq!(state, SystemState::Crash);
    }

    #[test]
    fn test_dead_pid_within_crash_gap_is_normal() {
        let now = Utc::now();
        let state = classify(&present(now, 4 * 60, 4242), secs(5 * HOUR), now, |_| false);
        assert_eq!(state, SystemState::Normal);
    }

    #[test]
    fn test_clean_shutdown_is_not_crash() {
        let now = Utc::now();
        let reading = HeartbeatReading::Present(
            Heartbeat::at(now - ChronoDuration::minutes(30), 4242).with_clean_shutdown(),
        );
        assert_eq!(classify(&reading, secs(5 * HOUR), now, |_| false), SystemState::Normal);
    }

    #[test]
    fn test_alive_pid_is_normal() {
        let now = Utc::now();
        let state = classify(&present(now, 10 * 60, 4242), secs(5 * HOUR), now, |pid| pid == 4242);
        assert_eq!(state, SystemState::Normal);
    }

    #[test]
    fn test_every_state_has_one_action() {
        use StartupAction::*;
        let expected = [
            (SystemState::FirstRun, CreateInitialCheckpoint),
            (SystemState::Restart, RestoreLatest),
            (SystemState::Crash, RecoverFromCrash),
            (SystemState::Sleep, RefreshHeartbeat),
            (SystemState::Normal, RefreshHeartbeat),
            (SystemState::Unknown, RefreshHeartbeat),
        ];
        for (state, action) in expected {
            assert_eq!(state.startup_action(), action, "{state}");
        }
    }
}
