//! Stub collaborators and a temporary data directory

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use tempfile::TempDir;

use relaunch::checkpoint::CheckpointManager;
use relaunch::config::{AppConfig, Config};
use relaunch::fs::DataDir;
use relaunch::launcher::LaunchPolicy;
use relaunch::models::{ProcessRecord, WindowState};
use relaunch::platform::{AppController, BatteryStatus, ProcessSource, SystemProbe};
use relaunch::storage::Storage;

pub const APPS: [&str; 4] = ["Safari", "Preview", "TextEdit", "Terminal"];

/// Process table shared by the source and the controller. Launching an
/// app adds it; `broken` apps never come up.
#[derive(Default)]
pub struct Desktop {
    running: Mutex<HashMap<String, (u32, u64)>>,
    broken: Mutex<HashSet<String>>,
    launched: Mutex<Vec<String>>,
    next_pid: AtomicU32,
}

impl Desktop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: AtomicU32::new(1000),
            ..Default::default()
        })
    }

    pub fn start(&self, app: &str, memory_mb: u64) {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.running
            .lock()
            .unwrap()
            .insert(app.to_string(), (pid, memory_mb));
    }

    pub fn quit_all(&self) {
        self.running.lock().unwrap().clear();
    }

    pub fn break_app(&self, app: &str) {
        self.broken.lock().unwrap().insert(app.to_string());
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    pub fn is_running(&self, app: &str) -> bool {
        self.running.lock().unwrap().contains_key(app)
    }
}

impl ProcessSource for Desktop {
    fn running_apps(&self, apps: &[AppConfig]) -> Vec<ProcessRecord> {
        let running = self.running.lock().unwrap();
        apps.iter()
            .filter_map(|app| {
                running.get(&app.process_name).map(|(pid, mem)| {
                    ProcessRecord::new(&app.name, &app.process_name, *pid).with_memory_mb(*mem)
                })
            })
            .collect()
    }
}

impl AppController for Desktop {
    fn open_application(&self, process_name: &str) -> Result<()> {
        self.launched.lock().unwrap().push(process_name.to_string());
        if self.broken.lock().unwrap().contains(process_name) {
            bail!("Unable to find application named '{process_name}'");
        }
        self.start(process_name, 0);
        Ok(())
    }

    fn find_process(&self, process_name: &str) -> Option<u32> {
        self.running
            .lock()
            .unwrap()
            .get(process_name)
            .map(|(pid, _)| *pid)
    }

    fn set_window_state(&self, _process_name: &str, _state: WindowState) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StubProbe {
    pub uptime: Option<Duration>,
    pub alive: Vec<u32>,
}

impl SystemProbe for StubProbe {
    fn uptime(&self) -> Option<Duration> {
        self.uptime
    }

    fn is_process_alive(&self, pid: u32) -> bool {
        self.alive.contains(&pid)
    }

    fn cpu_load(&self) -> Option<f64> {
        None
    }

    fn battery(&self) -> Option<BatteryStatus> {
        None
    }
}

pub struct TestEnv {
    _temp: TempDir,
    pub data_dir: DataDir,
    pub desktop: Arc<Desktop>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let data_dir = DataDir::new(temp.path());
        data_dir.initialize().expect("Failed to initialize data dir");
        Self {
            _temp: temp,
            data_dir,
            desktop: Desktop::new(),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            applications: APPS.iter().map(|name| AppConfig::new(name, name)).collect(),
            ..Config::default()
        }
    }

    pub fn manager(&self) -> CheckpointManager {
        self.manager_with(self.config())
    }

    pub fn manager_with(&self, config: Config) -> CheckpointManager {
        let storage = Storage::new(&self.data_dir);
        storage.initialize().expect("Failed to initialize storage");
        CheckpointManager::new(storage, config, self.desktop.clone(), self.desktop.clone())
            .with_launch_policy(LaunchPolicy::immediate(2))
    }
}
