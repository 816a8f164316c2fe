//! Whole-file create/replace writes.
//!
//! Data goes to a temporary file in the destination directory, is flushed to
//! disk, then renamed into place, so readers never observe a partial file.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the destination already exists
    CreateNew,
    /// Replace any existing file
    Replace,
}

/// Atomically write `data` to `path`, returning the number of bytes on disk.
///
/// A size mismatch after the rename is reported as a truncated write. With
/// [`WriteMode::CreateNew`] an existing destination yields [`Error::Io`] with
/// kind `AlreadyExists` so callers can tell a collision from a failed write.
pub fn write_atomic(path: &Path, data: &[u8], mode: WriteMode) -> Result<u64> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::write(path, "destination has no parent directory"))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::write(path, e))?;
    temp.write_all(data).map_err(|e| Error::write(path, e))?;
    temp.as_file().sync_all().map_err(|e| Error::write(path, e))?;

    match mode {
        WriteMode::CreateNew => {
            temp.persist_noclobber(path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::Io(e.error)
                } else {
                    Error::write(path, e.error)
                }
            })?;
        }
        WriteMode::Replace => {
            temp.persist(path).map_err(|e| Error::write(path, e.error))?;
        }
    }

    let written = fs::metadata(path).map_err(|e| Error::write(path, e))?.len();
    if written != data.len() as u64 {
        return Err(Error::write(
            path,
            format!("truncated write ({written} of {} bytes)", data.len()),
        ));
    }

    Ok(written)
}
