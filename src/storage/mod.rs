//! Checkpoint persistence.
//!
//! Layout under the checkpoint directory:
//!
//! ```text
//! checkpoints/
//!   <id>.ckpt            JSON record
//!   <id>.ckpt.zst        zstd-compressed record (replaces <id>.ckpt)
//!   last_used            id of the checkpoint last used for a restoration
//!   metadata/<id>.json   sidecar: checksum, sizes, app names
//! ```
//!
//! A record is committed once its sidecar exists. The sidecar checksum always
//! covers the bytes currently on disk.

pub mod codec;
pub mod metadata;
mod retention;


use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::{write_atomic, DataDir, WriteMode};
use crate::models::{Checkpoint, CheckpointMetadata};

use codec::{COMPRESSED_EXT, RECORD_EXT};
use metadata::MetadataStore;

pub use retention::DiskUsage;

const LAST_USED_FILE: &str = "last_used";

#[derive(Debug, Clone)]
pub struct Storage {
    checkpoints_dir: PathBuf,
    metadata: MetadataStore,
}

impl Storage {
    pub fn new(data_dir: &DataDir) -> Self {
        Self::with_dirs(&data_dir.checkpoints_dir(), &data_dir.metadata_dir())
    }

    pub fn with_dirs(checkpoints_dir: &Path, metadata_dir: &Path) -> Self {
        Self {
            checkpoints_dir: checkpoints_dir.to_path_buf(),
            metadata: MetadataStore::new(metadata_dir),
        }
    }

    /// Create the checkpoint and metadata directories.
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.checkpoints_dir)?;
        fs::create_dir_all(self.metadata.dir())?;
        Ok(())
    }

    pub fn checkpoints_dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{id}.{RECORD_EXT}"))
    }

    pub fn compressed_path(&self, id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{id}.{COMPRESSED_EXT}"))
    }

    /// Persist a new checkpoint and its metadata sidecar.
    ///
    /// On success the checkpoint's path and size describe the written record.
    /// An existing record or sidecar for the same id is never overwritten.
    pub fn save_checkpoint(&self, checkpoint: &mut Checkpoint) -> Result<(PathBuf, u64)> {
        let id = checkpoint.id.clone();
        if self.metadata.exists(&id) || self.compressed_path(&id).exists() {
            return Err(Error::IdCollision(id));
        }

        let bytes = codec::encode(checkpoint)?;
        let path = self.record_path(&id);
        let size = match write_atomic(&path, &bytes, WriteMode::CreateNew) {
            Ok(size) => size,
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::IdCollision(id))
            }
            Err(e) => return Err(e),
        };

        let metadata = CheckpointMetadata::for_checkpoint(checkpoint, size, codec::checksum(&bytes));
        if let Err(e) = self.metadata.write(&metadata) {
            // without a sidecar the record was never committed
            if let Err(remove_err) = fs::remove_file(&path) {
                tracing::warn!(%id, error = %remove_err, "failed to remove uncommitted record");
            }
            return Err(e);
        }

        checkpoint.file_path = Some(path.clone());
        checkpoint.file_size = size;
        checkpoint.is_compressed = false;

        tracing::info!(%id, size, apps = checkpoint.app_count(), "checkpoint saved");
        Ok((path, size))
    }

    /// Load and verify a checkpoint.
    ///
    /// When a sidecar exists its compression flag selects the file and its
    /// checksum must match the bytes on disk. An unparseable sidecar is a
    /// [`Error::CorruptRecord`]. Only without a sidecar is the compressed
    /// variant preferred and the integrity check skipped.
    pub fn load_checkpoint(&self, id: &str) -> Result<Checkpoint> {
        let metadata = self.metadata.read(id)?;

        let (path, compressed) = match &metadata {
            Some(meta) if meta.is_compressed => (self.compressed_path(id), true),
            Some(_) => (self.record_path(id), false),
            None => {
                let compressed_path = self.compressed_path(id);
                if compressed_path.exists() {
                    (compressed_path, true)
                } else {
                    (self.record_path(id), false)
                }
            }
        };

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        match &metadata {
            Some(meta) => {
                let actual = codec::checksum(&bytes);
                if actual != meta.checksum {
                    return Err(Error::Integrity {
                        id: id.to_string(),
                        expected: meta.checksum.clone(),
                        actual,
                    });
                }
            }
            None => tracing::warn!(%id, "no metadata for checkpoint, skipping integrity check"),
        }

        let json = if compressed {
            codec::decompress(&bytes).map_err(|e| Error::corrupt(id, e))?
        } else {
            bytes.clone()
        };

        let mut checkpoint = codec::decode(id, &json)?;
        checkpoint.is_compressed = compressed;
        checkpoint.file_path = Some(path);
        checkpoint.file_size = bytes.len() as u64;
        Ok(checkpoint)
    }

    /// Every checkpoint that can be listed.
    ///
    /// Sidecars are used when available so process data is not decoded;
    /// entries without a usable sidecar fall back to a full load, and entries
    /// failing both are skipped.
    pub fn load_all_checkpoints(&self) -> Result<Vec<Checkpoint>> {
        let mut ids = BTreeSet::new();
        if self.checkpoints_dir.exists() {
            for entry in fs::read_dir(&self.checkpoints_dir)? {
                let name = entry?.file_name();
                if let Some((id, _)) = name.to_str().and_then(codec::parse_record_name) {
                    ids.insert(id.to_string());
                }
            }
        }
        ids.extend(self.metadata.ids()?);

        let mut checkpoints = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(meta) = self.read_metadata_lenient(&id) {
                let path = if meta.is_compressed {
                    self.compressed_path(&id)
                } else {
                    self.record_path(&id)
                };
                if path.exists() {
                    checkpoints.push(Checkpoint::from_metadata(&meta, Some(path)));
                    continue;
                }
            }

            match self.load_checkpoint(&id) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(e) => tracing::warn!(%id, error = %e, "skipping unreadable checkpoint"),
            }
        }

        Ok(checkpoints)
    }

    /// Replace a record with its zstd-compressed form.
    ///
    /// The original is deleted only after the compressed record and the
    /// updated sidecar are both written. Already compressed checkpoints are
    /// left alone.
    pub fn compress_checkpoint(&self, checkpoint: &mut Checkpoint) -> Result<()> {
        let id = checkpoint.id.clone();
        if checkpoint.is_compressed {
            return Ok(());
        }

        let metadata = self.metadata.read(&id)?;
        if let Some(meta) = metadata.as_ref().filter(|m| m.is_compressed) {
            checkpoint.is_compressed = true;
            checkpoint.file_path = Some(self.compressed_path(&id));
            checkpoint.file_size = meta.current_size();
            return Ok(());
        }

        let record_path = self.record_path(&id);
        let bytes = match fs::read(&record_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NotFound(id)),
            Err(e) => return Err(e.into()),
        };

        let mut metadata = match metadata {
            Some(meta) => {
                let actual = codec::checksum(&bytes);
                if actual != meta.checksum {
                    return Err(Error::Integrity {
                        id,
                        expected: meta.checksum,
                        actual,
                    });
                }
                meta
            }
            None => {
                let decoded = codec::decode(&id, &bytes)?;
                CheckpointMetadata::for_checkpoint(&decoded, bytes.len() as u64, codec::checksum(&bytes))
            }
        };

        let compressed_path = self.compressed_path(&id);
        let compressed = codec::compress(&bytes).map_err(|e| Error::write(&compressed_path, e))?;
        let compressed_size = write_atomic(&compressed_path, &compressed, WriteMode::Replace)?;

        metadata.is_compressed = true;
        metadata.compressed_size = Some(compressed_size);
        metadata.checksum = codec::checksum(&compressed);
        self.metadata.write(&metadata)?;

        if let Err(e) = fs::remove_file(&record_path) {
            tracing::warn!(%id, error = %e, "failed to remove uncompressed record");
        }

        checkpoint.is_compressed = true;
        checkpoint.file_path = Some(compressed_path);
        checkpoint.file_size = compressed_size;

        tracing::info!(
            %id,
            original = metadata.original_size,
            compressed = compressed_size,
            "checkpoint compressed"
        );
        Ok(())
    }

    /// Remember which checkpoint a restoration used.
    pub fn record_last_used(&self, id: &str) -> Result<()> {
        let path = self.checkpoints_dir.join(LAST_USED_FILE);
        write_atomic(&path, id.as_bytes(), WriteMode::Replace)?;
        Ok(())
    }

    pub fn last_used(&self) -> Option<String> {
        fs::read_to_string(self.checkpoints_dir.join(LAST_USED_FILE))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn read_metadata_lenient(&self, id: &str) -> Option<CheckpointMetadata> {
        match self.metadata.read(id) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(%id, error = %e, "ignoring unreadable checkpoint metadata");
                None
            }
        }
    }
}
