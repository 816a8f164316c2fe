//! Layout of the daemon's private data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory location
pub const DATA_DIR_ENV: &str = "RELAUNCH_HOME";

const DEFAULT_DIR_NAME: &str = ".relaunch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve from `RELAUNCH_HOME`, falling back to `~/.relaunch`.
    pub fn from_env() -> io::Result<Self> {
        if let Some(root) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(root)));
        }

        let home = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Failed to get home directory")
        })?;
        Ok(Self::new(home.join(DEFAULT_DIR_NAME)))
    }

    /// Create the directory tree. Existing directories are left untouched.
    pub fn initialize(&self) -> io::Result<()> {
        for dir in [
            self.root.clone(),
            self.checkpoints_dir(),
            self.metadata_dir(),
            self.logs_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.checkpoints_dir().join("metadata")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.root.join("heartbeat.json")
    }

    pub fn work_pattern_path(&self) -> PathBuf {
        self.root.join("work_pattern.json")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join("metrics.json")
    }

    pub fn crash_state_path(&self) -> PathBuf {
        self.root.join("crash_state.yaml")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root.join("relaunch.pid")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join("relaunch.lock")
    }

    pub fn pause_marker_path(&self) -> PathBuf {
        self.root.join("paused")
    }

    pub fn is_paused(&self) -> bool {
        self.pause_marker_path().exists()
    }

    /// Create or remove the pause marker
    pub fn set_paused(&self, paused: bool) -> io::Result<()> {
        let marker = self.pause_marker_path();
        if paused {
            fs::write(&marker, chrono::Utc::now().to_rfc3339())
        } else {
            match fs::remove_file(&marker) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        }
    }

    /// PID recorded by the running daemon, if any
    pub fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_path())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_creates_tree() {
        let temp = TempDir::new().unwrap();
        let data_dir = DataDir::new(temp.path().join("state"));
        data_dir.initialize().unwrap();

        assert!(data_dir.checkpoints_dir().is_dir());
        assert!(data_dir.metadata_dir().is_dir());
        assert!(data_dir.logs_dir().is_dir());

        // idempotent
        data_dir.initialize().unwrap();
    }

    #[test]
    fn test_pause_marker_roundtrip() {
        let temp = TempDir::new().unwrap();
        let data_dir = DataDir::new(temp.path());

        assert!(!data_dir.is_paused());
        data_dir.set_paused(true).unwrap();
        assert!(data_dir.is_paused());
        data_dir.set_paused(false).unwrap();
        assert!(!data_dir.is_paused());
        // removing an absent marker is fine
        data_dir.set_paused(false).unwrap();
    }

    #[test]
    #[serial]
    fn test_from_env_override() {
        let temp = TempDir::new().unwrap();
        std::env::set_var(DATA_DIR_ENV, temp.path());
        let data_dir = DataDir::from_env().unwrap();
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(data_dir.root(), temp.path());
    }

    #[test]
    fn test_recorded_pid() {
        let temp = TempDir::new().unwrap();
        let data_dir = DataDir::new(temp.path());
        assert_eq!(data_dir.recorded_pid(), None);

        fs::write(data_dir.pid_path(), "4242\n").unwrap();
        assert_eq!(data_dir.recorded_pid(), Some(4242));
    }
}
