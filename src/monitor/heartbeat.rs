//! Daemon liveness record.
//!
//! The daemon rewrites `heartbeat.json` every minute. At the next start the
//! gap since the last write, compared with the OS uptime, tells a reboot from
//! a sleep or a crash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fs::{locked_read, locked_write};

/// Interval between heartbeat writes
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
    /// PID of the daemon that wrote it
    pub pid: u32,
    /// Written by the daemon on its way out; a dead PID is then no crash
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clean_shutdown: bool,
}

impl Heartbeat {
    pub fn now() -> Self {
        Self::at(Utc::now(), std::process::id())
    }

    pub fn at(timestamp: DateTime<Utc>, pid: u32) -> Self {
        Self {
            timestamp,
            pid,
            clean_shutdown: false,
        }
    }

    pub fn with_clean_shutdown(mut self) -> Self {
        self.clean_shutdown = true;
        self
    }

    /// Time since this heartbeat was written; zero if it lies in the future.
    pub fn gap(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.gap(now) > timeout
    }
}

/// Result of reading the heartbeat file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatReading {
    Missing,
    /// Present but not parseable
    Unreadable(String),
    Present(Heartbeat),
}

#[derive(Debug, Clone)]
pub struct HeartbeatStore {
    path: PathBuf,
}

impl HeartbeatStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> HeartbeatReading {
        let content = match locked_read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return HeartbeatReading::Missing,
            Err(e) => return HeartbeatReading::Unreadable(e.to_string()),
        };
        match serde_json::from_str(&content) {
            Ok(heartbeat) => HeartbeatReading::Present(heartbeat),
            Err(e) => HeartbeatReading::Unreadable(e.to_string()),
        }
    }

    pub fn write(&self, heartbeat: &Heartbeat) -> io::Result<()> {
        let json = serde_json::to_string(heartbeat).map_err(io::Error::other)?;
        locked_write(&self.path, &json)
    }

    /// Write a heartbeat for this process at the current time.
    pub fn touch(&self) -> io::Result<()> {
        self.write(&Heartbeat::now())
    }

    /// Final heartbeat written during a graceful shutdown.
    pub fn mark_clean_shutdown(&self) -> io::Result<()> {
        self.write(&Heartbeat::now().with_clean_shutdown())
    }
}
