//! Advisory file locking for state shared between the daemon and CLI commands.
//!
//! The heartbeat and pattern files are read by `relaunch status` while the
//! daemon rewrites them, so both sides go through these helpers. The instance
//! lock keeps a second daemon from starting against the same data directory.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Read file contents under a shared lock.
pub fn locked_read(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let mut content = String::new();
    BufReader::new(&file).read_to_string(&mut content)?;
    Ok(content)
}

/// Write file contents under an exclusive lock.
///
/// The sequence is: open → lock → truncate → write → flush. Truncating only
/// after the lock is held means a concurrent reader never sees an empty file.
pub fn locked_write(path: &Path, content: &str) -> io::Result<()> {
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new().write(true).create(true).open(path)?;
    file.lock_exclusive()?;
    file.set_len(0)?;
    let mut writer = BufWriter::new(&file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Exclusive lock on `relaunch.lock` held for the lifetime of the daemon.
///
/// The lock is released when the value is dropped or the process exits.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Try to take the lock without blocking.
    ///
    /// Returns `Ok(None)` when another process already holds it.
    pub fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        #[allow(clippy::suspicious_open_options)]
        let file = OpenOptions::new().write(true).create(true).open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_locked_write_and_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("heartbeat.json");

        locked_write(&path, "{\"pid\":1}").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "{\"pid\":1}");
    }

    #[test]
    fn test_locked_write_shorter_content_truncates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("heartbeat.json");

        locked_write(&path, "a much longer first payload").unwrap();
        locked_write(&path, "short").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "short");
    }

    #[test]
    fn test_concurrent_read_write() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("work_pattern.json");
        locked_write(&path, "write 0").unwrap();

        let read_path = path.clone();
        let reader = thread::spawn(move || {
            for _ in 0..50 {
                let content = locked_read(&read_path).unwrap();
                assert!(content.starts_with("write "));
            }
        });

        let write_path = path.clone();
        let writer = thread::spawn(move || {
            for i in 0..50 {
                locked_write(&write_path, &format!("write {i}")).unwrap();
            }
        });

        reader.join().unwrap();
        writer.join().unwrap();
    }

    #[test]
    fn test_instance_lock_is_exclusive() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("relaunch.lock");

        let first = InstanceLock::try_acquire(&path).unwrap();
        assert!(first.is_some());

        // fs2 locks are per open file description, so a second handle contends
        let second = InstanceLock::try_acquire(&path).unwrap();
        assert!(second.is_none());

        drop(first);
        assert!(InstanceLock::try_acquire(&path).unwrap().is_some());
    }
}
