use std::time::Duration;

use crate::config::{self, Config};

/// Fixed pause between attempts to launch the same application
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Timing and retry limits for a restoration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPolicy {
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
    /// Wait between activation and the verification lookup
    pub settle_delay: Duration,
    /// Wait after each successful launch before starting the next one
    pub launch_delay: Duration,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            max_retry_attempts: config::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            settle_delay: Duration::from_millis(config::DEFAULT_SETTLE_DELAY_MS),
            launch_delay: Duration::from_millis(config::DEFAULT_LAUNCH_DELAY_MS),
        }
    }
}

impl LaunchPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retry_attempts: config.retry_attempts(),
            retry_delay: DEFAULT_RETRY_DELAY,
            settle_delay: config.settle_delay(),
            launch_delay: config.launch_delay(),
        }
    }

    /// Policy with every delay zeroed, for tests
    pub fn immediate(max_retry_attempts: u32) -> Self {
        Self {
            max_retry_attempts,
            retry_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            launch_delay: Duration::ZERO,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}
