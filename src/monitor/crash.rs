//! Sliding-window crash counter.
//!
//! Repeated crashes in a short window mean the daemon is doing more harm than
//! good at login, so the start-up path disables auto-start once the
//! threshold is crossed. History is persisted as YAML so it survives the
//! restarts it is counting.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_CRASHES: usize = 3;
pub const DEFAULT_CRASH_WINDOW: Duration = Duration::hours(1);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CrashState {
    /// Crash times, oldest first
    #[serde(default)]
    crashes: Vec<DateTime<Utc>>,
    /// Set once the threshold was crossed; cleared only by [`CrashTracker::clear`]
    #[serde(default)]
    auto_start_disabled: bool,
}

#[derive(Debug)]
pub struct CrashTracker {
    path: PathBuf,
    state: CrashState,
    max_crashes: usize,
    window: Duration,
}

impl CrashTracker {
    /// Load persisted history; a missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        Self::with_limits(path, DEFAULT_MAX_CRASHES, DEFAULT_CRASH_WINDOW)
    }

    pub fn with_limits(path: &Path, max_crashes: usize, window: Duration) -> Self {
        let state = match fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable crash state");
                CrashState::default()
            }),
            Err(_) => CrashState::default(),
        };
        Self {
            path: path.to_path_buf(),
            state,
            max_crashes,
            window,
        }
    }

    pub fn record_crash(&mut self) -> Result<()> {
        self.record_crash_at(Utc::now())
    }

    pub fn record_crash_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.state.crashes.push(now);
        self.state.crashes.sort();
        self.prune(now);
        tracing::warn!(recent = self.state.crashes.len(), "crash recorded");
        self.save()
    }

    pub fn should_disable_auto_start(&mut self) -> bool {
        self.should_disable_auto_start_at(Utc::now())
    }

    /// True once `max_crashes` fall within the window. The answer is sticky
    /// until [`Self::clear`].
    pub fn should_disable_auto_start_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.auto_start_disabled {
            return true;
        }
        self.prune(now);
        if self.state.crashes.len() >= self.max_crashes {
            self.state.auto_start_disabled = true;
            if let Err(e) = self.save() {
                tracing::warn!(error = %e, "failed to persist crash state");
            }
            return true;
        }
        false
    }

    /// Crashes within the window as of `now`
    pub fn recent_crashes(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.state.crashes.len()
    }

    pub fn is_disabled(&self) -> bool {
        self.state.auto_start_disabled
    }

    /// Forget all crashes and re-allow auto-start.
    pub fn clear(&mut self) -> Result<()> {
        self.state = CrashState::default();
        self.save()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.state.crashes.retain(|t| *t > cutoff);
    }

    fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.state).context("Failed to serialize crash state")?;
        fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write crash state: {}", self.path.display()))
    }
}
