//! In-memory collaborators for unit tests.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{AppController, AutoStart, BatteryStatus, Notifier, ProcessSource, SystemProbe};
use crate::config::AppConfig;
use crate::models::{ProcessRecord, WindowState};

/// Controller whose applications start on the Nth `open_application` call.
#[derive(Debug, Default)]
pub struct FakeController {
    running: Mutex<HashMap<String, u32>>,
    /// Remaining failing opens per app; `u32::MAX` never succeeds
    failures: Mutex<HashMap<String, u32>>,
    /// Apps whose open succeeds but which never show up in the process table
    vanishing: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
    pub window_calls: Mutex<Vec<(String, WindowState)>>,
    next_pid: AtomicU32,
}

impl FakeController {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(1000),
            ..Default::default()
        }
    }

    pub fn with_running(self, process_name: &str, pid: u32) -> Self {
        self.running
            .lock()
            .unwrap()
            .insert(process_name.to_string(), pid);
        self
    }

    pub fn failing(self, app_name: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(app_name.to_string(), times);
        self
    }

    pub fn vanishing(self, app_name: &str) -> Self {
        self.vanishing.lock().unwrap().push(app_name.to_string());
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl AppController for FakeController {
    fn open_application(&self, process_name: &str) -> Result<()> {
        self.opened.lock().unwrap().push(process_name.to_string());

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(process_name) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(anyhow!("{process_name} refused to start"));
            }
        }

        if !self.vanishing.lock().unwrap().iter().any(|a| a == process_name) {
            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            self.running
                .lock()
                .unwrap()
                .insert(process_name.to_string(), pid);
        }
        Ok(())
    }

    fn find_process(&self, process_name: &str) -> Option<u32> {
        self.running.lock().unwrap().get(process_name).copied()
    }

    fn set_window_state(&self, process_name: &str, state: WindowState) -> Result<()> {
        self.window_calls
            .lock()
            .unwrap()
            .push((process_name.to_string(), state));
        if process_name == "Stubborn" {
            return Err(anyhow!("window not scriptable"));
        }
        Ok(())
    }
}

/// Process source returning a fixed snapshot filtered by the requested apps.
#[derive(Debug, Default)]
pub struct FakeProcessSource {
    pub records: Mutex<Vec<ProcessRecord>>,
}

impl FakeProcessSource {
    pub fn new(records: Vec<ProcessRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl ProcessSource for FakeProcessSource {
    fn running_apps(&self, apps: &[AppConfig]) -> Vec<ProcessRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| apps.iter().any(|a| a.name == r.name))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct FakeProbe {
    pub uptime: Option<Duration>,
    pub alive: Vec<u32>,
    pub cpu: Option<f64>,
    pub battery: Option<BatteryStatus>,
}

impl SystemProbe for FakeProbe {
    fn uptime(&self) -> Option<Duration> {
        self.uptime
    }

    fn is_process_alive(&self, pid: u32) -> bool {
        self.alive.contains(&pid)
    }

    fn cpu_load(&self) -> Option<f64> {
        self.cpu
    }

    fn battery(&self) -> Option<BatteryStatus> {
        self.battery
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, title: &str, message: &str) {
        self.infos.lock().unwrap().push(format!("{title}: {message}"));
    }

    fn error(&self, title: &str, message: &str) {
        self.errors.lock().unwrap().push(format!("{title}: {message}"));
    }

    fn confirm(&self, _title: &str, _message: &str) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct FakeAutoStart {
    pub installed: Mutex<bool>,
    pub enabled: Mutex<bool>,
}

impl AutoStart for FakeAutoStart {
    fn install(&self, _executable: &Path) -> Result<()> {
        *self.installed.lock().unwrap() = true;
        *self.enabled.lock().unwrap() = true;
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        *self.installed.lock().unwrap() = false;
        Ok(())
    }

    fn enable(&self) -> Result<()> {
        *self.enabled.lock().unwrap() = true;
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        *self.enabled.lock().unwrap() = false;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        *self.installed.lock().unwrap()
    }

    fn is_enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }
}
