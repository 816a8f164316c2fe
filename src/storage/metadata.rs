//! JSON sidecars under `checkpoints/metadata/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::{write_atomic, WriteMode};
use crate::models::CheckpointMetadata;

#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path(id).exists()
    }

    /// `Ok(None)` when no sidecar exists; a sidecar that cannot be parsed is
    /// a [`Error::CorruptRecord`].
    pub fn read(&self, id: &str) -> Result<Option<CheckpointMetadata>> {
        let path = self.path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata: CheckpointMetadata = serde_json::from_str(&content)
            .map_err(|e| Error::corrupt(id, format!("metadata: {e}")))?;
        Ok(Some(metadata))
    }

    pub fn write(&self, metadata: &CheckpointMetadata) -> Result<()> {
        let path = self.path(&metadata.id);
        let json = serde_json::to_vec_pretty(metadata).map_err(|e| Error::write(&path, e))?;
        write_atomic(&path, &json, WriteMode::Replace)?;
        Ok(())
    }

    /// Remove a sidecar; an absent one is not an error.
    pub fn remove(&self, id: &str) -> io::Result<()> {
        match fs::remove_file(self.path(id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub fn ids(&self) -> io::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}
