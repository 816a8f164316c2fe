//! Restoration outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of relaunching one application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchResult {
    pub app_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub launch_time: DateTime<Utc>,
    /// Attempts consumed
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LaunchResult {
    pub fn succeeded(app_name: impl Into<String>, pid: u32, launch_time: DateTime<Utc>) -> Self {
        Self {
            app_name: app_name.into(),
            success: true,
            pid: Some(pid),
            launch_time,
            retry_count: 0,
            error: None,
        }
    }

    pub fn failed(
        app_name: impl Into<String>,
        launch_time: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            success: false,
            pid: None,
            launch_time,
            retry_count: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate over one restoration run's results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSummary {
    pub successful: usize,
    pub failed: usize,
    pub failed_apps: Vec<String>,
}

impl LaunchSummary {
    pub fn from_results(results: &[LaunchResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            if result.success {
                summary.successful += 1;
            } else {
                summary.failed += 1;
                summary.failed_apps.push(result.app_name.clone());
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    /// Fraction of attempted launches that succeeded, `None` if nothing was launched
    pub fn success_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.successful as f64 / total as f64),
        }
    }
}

/// Everything a restoration run produced.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub checkpoint_id: String,
    pub results: Vec<LaunchResult>,
    /// Applications left alone because they were already running
    pub skipped: Vec<String>,
    pub summary: LaunchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_names() {
        let now = Utc::now();
        let results = vec![
            LaunchResult::succeeded("Safari", 10, now),
            LaunchResult::failed("Preview", now, "boom"),
            LaunchResult::succeeded("TextEdit", 11, now),
        ];

        let summary = LaunchSummary::from_results(&results);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_apps, vec!["Preview"]);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_success_rate_empty_is_none() {
        assert_eq!(LaunchSummary::default().success_rate(), None);
        let summary = LaunchSummary {
            successful: 1,
            failed: 1,
            failed_apps: vec!["x".into()],
        };
        assert_eq!(summary.success_rate(), Some(0.5));
    }
}
