//! Retention cleanup and disk usage for the checkpoint directory.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;

use super::{codec, Storage};
use crate::error::Result;

/// Filesystem usage of the volume holding the checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl DiskUsage {
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        used as f64 / self.total_bytes as f64 * 100.0
    }
}

impl Storage {
    /// Delete every record last modified strictly before `cutoff`.
    ///
    /// A sidecar goes once no record file for its id remains. Failures on
    /// individual files are logged and the sweep continues. Returns the
    /// number of record files deleted.
    pub fn clean_old_checkpoints(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        if !self.checkpoints_dir.exists() {
            return Ok(0);
        }

        let mut deleted = 0;
        let mut touched = BTreeSet::new();

        for entry in fs::read_dir(&self.checkpoints_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read checkpoint directory entry");
                    continue;
                }
            };
            let name = entry.file_name();
            let Some((id, _)) = name.to_str().and_then(codec::parse_record_name) else {
                continue;
            };

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "failed to read record mtime");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    deleted += 1;
                    touched.insert(id.to_string());
                    tracing::debug!(%id, %modified, "deleted expired checkpoint record");
                }
                Err(e) => tracing::warn!(%id, error = %e, "failed to delete expired record"),
            }
        }

        for id in touched {
            if self.record_path(&id).exists() || self.compressed_path(&id).exists() {
                continue;
            }
            if let Err(e) = self.metadata.remove(&id) {
                tracing::warn!(%id, error = %e, "failed to delete checkpoint metadata");
            }
        }

        if deleted > 0 {
            tracing::info!(deleted, %cutoff, "retention cleanup removed checkpoints");
        }
        Ok(deleted)
    }

    /// Usage of the filesystem holding the checkpoint directory.
    pub fn disk_usage(&self) -> Result<DiskUsage> {
        let stat = nix::sys::statvfs::statvfs(&self.checkpoints_dir)
            .map_err(std::io::Error::from)?;
        let fragment = stat.fragment_size() as u64;
        Ok(DiskUsage {
            total_bytes: stat.blocks() as u64 * fragment,
            available_bytes: stat.blocks_available() as u64 * fragment,
        })
    }
}
