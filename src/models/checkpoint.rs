//! Checkpoint types
//!
//! A checkpoint is the set of monitored applications that were running at one
//! point in time. The record written to disk carries only the content fields;
//! `file_path`, `file_size` and `is_compressed` describe where and how the
//! record currently lives and are maintained by the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::process::ProcessRecord;

/// Identifier format: second resolution, lexicographically sortable.
pub const CHECKPOINT_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Derive the checkpoint identifier for a creation time.
pub fn checkpoint_id_for(timestamp: DateTime<Utc>) -> String {
    timestamp.format(CHECKPOINT_ID_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub app_names: Vec<String>,
    #[serde(skip)]
    pub is_compressed: bool,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
    #[serde(skip)]
    pub file_size: u64,
}

impl Checkpoint {
    pub fn new(timestamp: DateTime<Utc>, processes: Vec<ProcessRecord>) -> Self {
        let app_names = processes.iter().map(|p| p.name.clone()).collect();
        Self {
            id: checkpoint_id_for(timestamp),
            timestamp,
            processes,
            app_names,
            is_compressed: false,
            file_path: None,
            file_size: 0,
        }
    }

    /// Summary view built from a metadata sidecar; carries no process data.
    pub fn from_metadata(metadata: &CheckpointMetadata, file_path: Option<PathBuf>) -> Self {
        Self {
            id: metadata.id.clone(),
            timestamp: metadata.timestamp,
            processes: Vec::new(),
            app_names: metadata.app_names.clone(),
            is_compressed: metadata.is_compressed,
            file_path,
            file_size: metadata.current_size(),
        }
    }

    pub fn app_count(&self) -> usize {
        self.app_names.len()
    }
}

/// Sidecar written next to every checkpoint record.
///
/// `checksum` is the SHA-256 of the record's current on-disk bytes, so it
/// changes when the record is compressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub is_compressed: bool,
    pub original_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    pub checksum: String,
    pub app_count: usize,
    #[serde(default)]
    pub app_names: Vec<String>,
}

impl CheckpointMetadata {
    pub fn for_checkpoint(checkpoint: &Checkpoint, original_size: u64, checksum: String) -> Self {
        Self {
            id: checkpoint.id.clone(),
            timestamp: checkpoint.timestamp,
            is_compressed: false,
            original_size,
            compressed_size: None,
            checksum,
            app_count: checkpoint.processes.len(),
            app_names: checkpoint.app_names.clone(),
        }
    }

    /// Size of the record as it currently exists on disk
    pub fn current_size(&self) -> u64 {
        match (self.is_compressed, self.compressed_size) {
            (true, Some(size)) => size,
            _ => self.original_size,
        }
    }
}

/// Read-only listing of known checkpoints, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointList {
    pub checkpoints: Vec<Checkpoint>,
    /// Checkpoint most recently used for a restoration
    pub last_used: Option<String>,
    pub total_count: usize,
    pub compressed_count: usize,
}

impl CheckpointList {
    /// Sort newest first (ties broken by identifier) and compute the counters.
    pub fn new(mut checkpoints: Vec<Checkpoint>, last_used: Option<String>) -> Self {
        checkpoints.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        let compressed_count = checkpoints.iter().filter(|c| c.is_compressed).count();
        Self {
            total_count: checkpoints.len(),
            compressed_count,
            checkpoints,
            last_used,
        }
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.first()
    }

    pub fn get(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
