//! Error taxonomy for the checkpoint and restoration core.
//!
//! Per-application launch failures are not errors: they are recorded as
//! unsuccessful [`LaunchResult`](crate::models::LaunchResult)s and summarized.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    #[error("Checksum mismatch for checkpoint {id} - file may be corrupted (expected: {expected}, got: {actual})")]
    Integrity {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to write {}: {reason}", path.display())]
    StorageWrite { path: PathBuf, reason: String },

    /// Decoding failed even though the integrity check passed.
    #[error("Checkpoint {id} is unreadable: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("Checkpoint {0} already exists; refusing to overwrite it")]
    IdCollision(String),

    #[error("No checkpoints available for restoration")]
    NoCheckpoints,

    #[error("Initialization timeout (>{}s)", .0.as_secs())]
    InitializationTimeout(Duration),

    #[error("Permission required: {0}")]
    Permission(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("Auto-start disabled after {0} crashes in the crash window")]
    AutoStartDisabled(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StorageWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(id: &str, reason: impl ToString) -> Self {
        Error::CorruptRecord {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
