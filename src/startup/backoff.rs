//! Bounded restart loop.

use anyhow::{anyhow, Result};
use std::thread;
use std::time::Duration;

pub const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_retries: u32,
    /// Delay before each attempt; the last entry repeats
    pub backoff: Vec<Duration>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_BACKOFF.len() as u32,
            backoff: DEFAULT_BACKOFF.to_vec(),
        }
    }
}

impl RestartPolicy {
    /// Policy without delays, for tests and manual restarts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Vec::new(),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.backoff.len().saturating_sub(1));
        self.backoff.get(index).copied().unwrap_or(Duration::ZERO)
    }
}

/// Call `spawn` after each backoff delay until it succeeds or the policy's
/// attempts are used up. Returns the number of attempts consumed.
pub fn restart_with_backoff<F>(policy: &RestartPolicy, mut spawn: F) -> Result<u32>
where
    F: FnMut() -> Result<()>,
{
    let mut last_error = None;

    for attempt in 0..policy.max_retries {
        let delay = policy.delay_for(attempt);
        tracing::info!(
            attempt = attempt + 1,
            max = policy.max_retries,
            delay_secs = delay.as_secs(),
            "restarting after backoff"
        );
        thread::sleep(delay);

        match spawn() {
            Ok(()) => {
                tracing::info!(attempt = attempt + 1, "restart initiated");
                return Ok(attempt + 1);
            }
            Err(e) => {
                tracing::error!(attempt = attempt + 1, error = %e, "restart failed");
                last_error = Some(e);
            }
        }
    }

    let message = format!("max restart retries ({}) exceeded", policy.max_retries);
    Err(match last_error {
        Some(e) => e.context(message),
        None => anyhow!(message),
    })
}
