//! Daemon configuration persisted as `config.toml` in the data directory.
//!
//! The configuration is loaded once at start-up and handed by value to each
//! component; nothing reads it through a global.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_CHECKPOINT_INTERVAL_MINS: u64 = 15;
pub const DEFAULT_RETENTION_DAYS: u64 = 7;
/// Upper bound on `retention_days` (ten years)
pub const MAX_RETENTION_DAYS: u64 = 3650;
/// Upper bound on `checkpoint_interval_mins` (one day)
pub const MAX_CHECKPOINT_INTERVAL_MINS: u64 = 24 * 60;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_LAUNCH_DELAY_MS: u64 = 7000;
/// Launch delay substituted when a configuration carries an unusable value
pub const FALLBACK_LAUNCH_DELAY_MS: u64 = 2000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;
pub const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ACTIVE_APP_THRESHOLD: usize = 3;

/// An application the daemon watches and restores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name used to activate the application (`open -a <name>`)
    pub name: String,
    /// Executable name looked up in the process table
    pub process_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl AppConfig {
    pub fn new(name: &str, process_name: &str) -> Self {
        Self {
            name: name.to_string(),
            process_name: process_name.to_string(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Monitored applications
    pub applications: Vec<AppConfig>,
    /// Base interval between periodic checkpoints
    #[serde(default = "default_interval")]
    pub checkpoint_interval_mins: u64,
    /// Checkpoints older than this are deleted during maintenance
    #[serde(default = "default_retention")]
    pub retention_days: u64,
    /// Restore the latest checkpoint automatically after a restart
    #[serde(default = "default_true")]
    pub auto_restore: bool,
    #[serde(default = "default_retries")]
    pub max_retry_attempts: i64,
    /// Pause after each successful launch before the next application
    #[serde(default = "default_launch_delay")]
    pub launch_delay_ms: i64,
    /// Pause between activating an application and verifying it is running
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Upper bound on a single activation command
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
    /// Number of running monitored apps that counts as intensive work
    #[serde(default = "default_active_threshold")]
    pub active_app_threshold: usize,
}

fn default_interval() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL_MINS
}
fn default_retention() -> u64 {
    DEFAULT_RETENTION_DAYS
}
fn default_retries() -> i64 {
    DEFAULT_MAX_RETRY_ATTEMPTS as i64
}
fn default_launch_delay() -> i64 {
    DEFAULT_LAUNCH_DELAY_MS as i64
}
fn default_settle_delay() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}
fn default_launch_timeout() -> u64 {
    DEFAULT_LAUNCH_TIMEOUT_SECS
}
fn default_active_threshold() -> usize {
    DEFAULT_ACTIVE_APP_THRESHOLD
}

impl Default for Config {
    fn default() -> Self {
        Self {
            applications: default_applications(),
            checkpoint_interval_mins: DEFAULT_CHECKPOINT_INTERVAL_MINS,
            retention_days: DEFAULT_RETENTION_DAYS,
            auto_restore: true,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS as i64,
            launch_delay_ms: DEFAULT_LAUNCH_DELAY_MS as i64,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT_SECS,
            active_app_threshold: DEFAULT_ACTIVE_APP_THRESHOLD,
        }
    }
}

fn default_applications() -> Vec<AppConfig> {
    vec![
        AppConfig::new("Google Chrome", "Google Chrome"),
        AppConfig::new("Safari", "Safari"),
        AppConfig::new("Brave Browser", "Brave Browser"),
        AppConfig::new("TextEdit", "TextEdit"),
        AppConfig::new("Firefox", "firefox"),
        AppConfig::new("Claude", "Claude"),
        AppConfig::new("Preview", "Preview"),
    ]
}

impl Config {
    /// Load `config.toml`, writing the defaults first when it does not exist.
    ///
    /// The loaded value is validated; repairable fields are fixed in memory.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject unusable settings and repair the ones with a safe fallback.
    ///
    /// Retry attempts below one become the default; a negative launch delay
    /// becomes [`FALLBACK_LAUNCH_DELAY_MS`]. An empty application list, or a
    /// retention or interval that is zero or above its maximum, is an error.
    pub fn validate(&mut self) -> Result<()> {
        if self.applications.is_empty() {
            return Err(Error::Config("at least one application must be configured".into()));
        }
        if self.retention_days == 0 {
            return Err(Error::Config("retention_days must be positive".into()));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(Error::Config(format!(
                "retention_days must be at most {MAX_RETENTION_DAYS}"
            )));
        }
        if self.checkpoint_interval_mins == 0 {
            return Err(Error::Config("checkpoint_interval_mins must be positive".into()));
        }
        if self.checkpoint_interval_mins > MAX_CHECKPOINT_INTERVAL_MINS {
            return Err(Error::Config(format!(
                "checkpoint_interval_mins must be at most {MAX_CHECKPOINT_INTERVAL_MINS}"
            )));
        }
        if self.max_retry_attempts < 1 {
            tracing::warn!(
                value = self.max_retry_attempts,
                "max_retry_attempts below 1, using default"
            );
            self.max_retry_attempts = DEFAULT_MAX_RETRY_ATTEMPTS as i64;
        }
        if self.launch_delay_ms < 0 {
            tracing::warn!(value = self.launch_delay_ms, "negative launch_delay_ms, using fallback");
            self.launch_delay_ms = FALLBACK_LAUNCH_DELAY_MS as i64;
        }
        if self.active_app_threshold == 0 {
            self.active_app_threshold = DEFAULT_ACTIVE_APP_THRESHOLD;
        }
        Ok(())
    }

    pub fn enabled_applications(&self) -> Vec<AppConfig> {
        self.applications
            .iter()
            .filter(|app| app.enabled)
            .cloned()
            .collect()
    }

    /// Base checkpoint interval, clamped to [`MAX_CHECKPOINT_INTERVAL_MINS`]
    /// for configurations that skipped validation.
    pub fn checkpoint_interval(&self) -> chrono::Duration {
        let mins = self.checkpoint_interval_mins.min(MAX_CHECKPOINT_INTERVAL_MINS);
        chrono::Duration::minutes(mins as i64)
    }

    /// Retention period; `None` when it does not fit in a `chrono::Duration`.
    pub fn retention(&self) -> Option<chrono::Duration> {
        i64::try_from(self.retention_days)
            .ok()
            .and_then(chrono::Duration::try_days)
    }

    pub fn retry_attempts(&self) -> u32 {
        u32::try_from(self.max_retry_attempts.max(1)).unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS)
    }

    pub fn launch_delay(&self) -> Duration {
        Duration::from_millis(self.launch_delay_ms.max(0) as u64)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }
}
