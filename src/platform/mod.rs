//! Seams between the checkpoint core and the operating system.
//!
//! The core only talks to these traits. Default implementations for macOS
//! and other unix desktops live in the submodules; tests substitute fakes.

mod applescript;
pub mod autostart;
pub mod controller;
#[cfg(test)]
pub(crate) mod fake;
pub mod notify;
pub mod probe;
pub mod process_source;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::config::AppConfig;
use crate::models::{ProcessRecord, WindowState};

pub use autostart::FileAutoStart;
pub use controller::SystemController;
pub use notify::{ConsoleNotifier, LogNotifier};
pub use probe::{accessibility_granted, HostProbe};
pub use process_source::PsProcessSource;

/// Enumerates which monitored applications are running.
pub trait ProcessSource: Send + Sync {
    /// Running subset of `apps`. An application that cannot be inspected is
    /// left out rather than reported with guessed values.
    fn running_apps(&self, apps: &[AppConfig]) -> Vec<ProcessRecord>;
}

/// Activates applications and inspects the result.
///
/// Activation and window control address an application by its process
/// name, the same name used for the lookup after launch.
pub trait AppController: Send + Sync {
    fn open_application(&self, process_name: &str) -> Result<()>;

    /// PID of a running process with this executable name
    fn find_process(&self, process_name: &str) -> Option<u32>;

    fn set_window_state(&self, process_name: &str, state: WindowState) -> Result<()>;
}

/// Battery reading from the power source manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub percent: u8,
    pub on_ac_power: bool,
}

/// Host measurements. `None` means the platform could not provide a reading.
pub trait SystemProbe: Send + Sync {
    fn uptime(&self) -> Option<Duration>;

    fn is_process_alive(&self, pid: u32) -> bool;

    /// CPU load as a percentage of total capacity
    fn cpu_load(&self) -> Option<f64>;

    fn battery(&self) -> Option<BatteryStatus>;
}

/// Registration with the login session manager.
pub trait AutoStart: Send + Sync {
    fn install(&self, executable: &Path) -> Result<()>;
    fn uninstall(&self) -> Result<()>;
    fn enable(&self) -> Result<()>;
    fn disable(&self) -> Result<()>;
    fn is_installed(&self) -> bool;
    fn is_enabled(&self) -> bool;
}

/// User-facing messages and yes/no questions.
pub trait Notifier: Send + Sync {
    fn info(&self, title: &str, message: &str);
    fn error(&self, title: &str, message: &str);
    fn confirm(&self, title: &str, message: &str) -> bool;
}
