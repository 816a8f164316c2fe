//! Process start-up: single instance, bounded initialization, crash
//! bookkeeping and the auto-start switch.

mod backoff;
mod permissions;

pub use backoff::{restart_with_backoff, RestartPolicy, DEFAULT_BACKOFF};
pub use permissions::check_permissions;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::fs::{DataDir, InstanceLock};
use crate::monitor::CrashTracker;
use crate::platform::{AutoStart, Notifier};
use crate::process::is_process_alive;

/// Upper bound on initialization before start-up is abandoned
pub const INIT_TIMEOUT: Duration = Duration::from_secs(8);

/// Proof that this process is the only running daemon.
///
/// Dropping it removes the pid file (if it is still ours) and releases the
/// lock.
#[derive(Debug)]
pub struct InstanceGuard {
    _lock: InstanceLock,
    pid_path: PathBuf,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let recorded = fs::read_to_string(&self.pid_path)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok());
        if recorded == Some(std::process::id()) {
            let _ = fs::remove_file(&self.pid_path);
        }
    }
}

pub struct StartupManager {
    data_dir: DataDir,
    crash_tracker: CrashTracker,
    autostart: Arc<dyn AutoStart>,
    notifier: Arc<dyn Notifier>,
    init_timeout: Duration,
}

impl StartupManager {
    pub fn new(data_dir: DataDir, autostart: Arc<dyn AutoStart>, notifier: Arc<dyn Notifier>) -> Self {
        let crash_tracker = CrashTracker::load(&data_dir.crash_state_path());
        Self {
            data_dir,
            crash_tracker,
            autostart,
            notifier,
            init_timeout: INIT_TIMEOUT,
        }
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_crash_tracker(mut self, tracker: CrashTracker) -> Self {
        self.crash_tracker = tracker;
        self
    }

    pub fn crash_tracker(&mut self) -> &mut CrashTracker {
        &mut self.crash_tracker
    }

    /// Take the instance lock and record our pid.
    ///
    /// Fails with [`Error::AlreadyRunning`] while another process holds the
    /// lock. The reported pid is 0 when the holder left no live pid behind.
    pub fn acquire_instance(&self) -> Result<InstanceGuard> {
        let Some(lock) = InstanceLock::try_acquire(&self.data_dir.lock_path())? else {
            let pid = self
                .data_dir
                .recorded_pid()
                .filter(|pid| is_process_alive(*pid))
                .unwrap_or(0);
            return Err(Error::AlreadyRunning(pid));
        };

        let pid_path = self.data_dir.pid_path();
        fs::write(&pid_path, std::process::id().to_string())?;
        tracing::debug!(lock = %lock.path().display(), "single instance lock acquired");
        Ok(InstanceGuard {
            _lock: lock,
            pid_path,
        })
    }

    /// Run `init` under the crash policy.
    ///
    /// Refuses to start once the crash tracker has locked auto-start out.
    /// `init` runs on its own thread; if it has not finished within the
    /// initialization bound the start fails with
    /// [`Error::InitializationTimeout`] and the thread is abandoned. An
    /// `init` error counts as a crash.
    pub fn start_with_policy<T, F>(&mut self, init: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let started = Instant::now();

        if self.crash_tracker.should_disable_auto_start() {
            let crashes = self.crash_tracker.recent_crashes(Utc::now());
            tracing::warn!(crashes, "crashed too many times, refusing to start");
            self.notifier.error(
                "Auto-start disabled",
                "relaunch crashed repeatedly and auto-start was disabled. \
                 Run `relaunch enable-autostart` to turn it back on.",
            );
            self.disable_after_crashes();
            return Err(Error::AutoStartDisabled(crashes).into());
        }

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("relaunch-init".to_string())
            .spawn(move || {
                let _ = tx.send(init());
            })
            .context("Failed to spawn initialization thread")?;

        match rx.recv_timeout(self.init_timeout) {
            Ok(Ok(value)) => {
                let elapsed = started.elapsed();
                if elapsed > self.init_timeout.saturating_sub(Duration::from_secs(1)) {
                    tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "slow start-up");
                } else {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "started");
                }
                Ok(value)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "initialization failed");
                self.record_failure(&e);
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(timeout_secs = self.init_timeout.as_secs(), "initialization timed out");
                Err(Error::InitializationTimeout(self.init_timeout).into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                let e = anyhow!("initialization thread panicked");
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Install the auto-start entry for `executable` and enable it.
    /// Returns false when it was already installed.
    pub fn install(&self, executable: &Path) -> anyhow::Result<bool> {
        if self.autostart.is_installed() {
            tracing::info!("auto-start already installed");
            return Ok(false);
        }
        self.autostart
            .install(executable)
            .context("Failed to install auto-start")?;
        self.autostart.enable().context("Failed to enable auto-start")?;
        tracing::info!(executable = %executable.display(), "auto-start installed");
        Ok(true)
    }

    /// Returns false when nothing was installed.
    pub fn uninstall(&self) -> anyhow::Result<bool> {
        if !self.autostart.is_installed() {
            return Ok(false);
        }
        self.autostart
            .uninstall()
            .context("Failed to uninstall auto-start")?;
        tracing::info!("auto-start uninstalled");
        Ok(true)
    }

    /// Re-enable auto-start and forget the crash history.
    pub fn enable_autostart(&mut self) -> anyhow::Result<()> {
        if !self.autostart.is_installed() {
            bail!("Auto-start not installed, run: relaunch install");
        }
        self.autostart.enable().context("Failed to enable auto-start")?;
        self.crash_tracker.clear()?;
        tracing::info!("auto-start enabled");
        Ok(())
    }

    /// Crash history is kept.
    pub fn disable_autostart(&self) -> anyhow::Result<()> {
        if !self.autostart.is_installed() {
            bail!("Auto-start not installed");
        }
        self.autostart.disable().context("Failed to disable auto-start")?;
        tracing::info!("auto-start disabled");
        Ok(())
    }

    pub fn autostart_installed(&self) -> bool {
        self.autostart.is_installed()
    }

    pub fn autostart_enabled(&self) -> bool {
        self.autostart.is_installed() && self.autostart.is_enabled()
    }

    fn record_failure(&mut self, error: &anyhow::Error) {
        if let Err(e) = self.crash_tracker.record_crash() {
            tracing::warn!(error = %e, "failed to persist crash");
        }
        self.notifier
            .error("relaunch initialization failed", &format!("{error:#}"));
        if self.crash_tracker.should_disable_auto_start() {
            tracing::error!("crash threshold exceeded, disabling auto-start");
            self.disable_after_crashes();
        }
    }

    fn disable_after_crashes(&self) {
        if !self.autostart.is_installed() {
            return;
        }
        if let Err(e) = self.autostart.disable() {
            tracing::warn!(error = %e, "failed to disable auto-start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakeAutoStart, RecordingNotifier};
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        data_dir: DataDir,
        autostart: Arc<FakeAutoStart>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let data_dir = DataDir::new(temp.path());
            data_dir.initialize().unwrap();
            Self {
                _temp: temp,
                data_dir,
                autostart: Arc::new(FakeAutoStart::default()),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn manager(&self) -> StartupManager {
            StartupManager::new(
                self.data_dir.clone(),
                self.autostart.clone(),
                self.notifier.clone(),
            )
        }
    }

    #[test]
    fn test_second_instance_is_refused() {
        let fx = Fixture::new();
        let manager = fx.manager();

        let guard = manager.acquire_instance().unwrap();
        assert_eq!(fx.data_dir.recorded_pid(), Some(std::process::id()));

        match manager.acquire_instance() {
            Err(Error::AlreadyRunning(pid)) => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }

        drop(guard);
        assert_eq!(fx.data_dir.recorded_pid(), None);
        assert!(manager.acquire_instance().is_ok());
    }

    #[test]
    fn test_successful_start_returns_init_value() {
        let fx = Fixture::new();
        let mut manager = fx.manager();

        let value = manager.start_with_policy(|| Ok(42)).unwrap();
        assert_eq!(value, 42);
        assert_eq!(manager.crash_tracker().recent_crashes(Utc::now()), 0);
    }

    #[test]
    fn test_slow_init_times_out() {
        let fx = Fixture::new();
        let mut manager = fx.manager().with_init_timeout(Duration::from_millis(50));

        let err = manager
            .start_with_policy(|| {
                thread::sleep(Duration::from_millis(500));
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InitializationTimeout(_))
        ));
    }

    #[test]
    fn test_init_failure_records_crash_and_notifies() {
        let fx = Fixture::new();
        let mut manager = fx.manager();

        let err = manager
            .start_with_policy::<(), _>(|| bail!("config unreadable"))
            .unwrap_err();
        assert!(err.to_string().contains("config unreadable"));
        assert_eq!(manager.crash_tracker().recent_crashes(Utc::now()), 1);
        assert_eq!(fx.notifier.errors().len(), 1);

        let reloaded = CrashTracker::load(&fx.data_dir.crash_state_path());
        assert!(!reloaded.is_disabled());
    }

    #[test]
    fn test_repeated_failures_disable_autostart() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        manager.install(Path::new("/usr/local/bin/relaunch")).unwrap();

        for _ in 0..3 {
            let _ = manager.start_with_policy::<(), _>(|| bail!("boom"));
        }
        assert!(!fx.autostart.is_enabled());

        let err = manager.start_with_policy(|| Ok(())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AutoStartDisabled(3))
        ));
        assert!(fx
            .notifier
            .errors()
            .iter()
            .any(|e| e.starts_with("Auto-start disabled")));
    }

    #[test]
    fn test_enable_clears_crash_history_and_disable_keeps_it() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        manager.install(Path::new("/usr/local/bin/relaunch")).unwrap();
        manager.crash_tracker().record_crash().unwrap();

        manager.disable_autostart().unwrap();
        assert!(!manager.autostart_enabled());
        assert_eq!(manager.crash_tracker().recent_crashes(Utc::now()), 1);

        manager.enable_autostart().unwrap();
        assert!(manager.autostart_enabled());
        assert_eq!(manager.crash_tracker().recent_crashes(Utc::now()), 0);
    }

    #[test]
    fn test_enable_requires_install() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        assert!(manager.enable_autostart().is_err());
        assert!(manager.disable_autostart().is_err());
    }

    #[test]
    fn test_install_and_uninstall_report_changes() {
        let fx = Fixture::new();
        let manager = fx.manager();
        let exe = Path::new("/usr/local/bin/relaunch");

        assert!(manager.install(exe).unwrap());
        assert!(!manager.install(exe).unwrap());
        assert!(manager.autostart_enabled());
        assert!(manager.uninstall().unwrap());
        assert!(!manager.uninstall().unwrap());
        assert!(!manager.autostart_installed());
    }
}
