//! Default [`ProcessSource`] backed by the `ps` process table.

use super::ProcessSource;
use crate::config::AppConfig;
use crate::models::{ProcessRecord, WindowState};
use crate::process::{self, ProcessEntry};

#[derive(Debug, Default, Clone)]
pub struct PsProcessSource;

impl PsProcessSource {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSource for PsProcessSource {
    fn running_apps(&self, apps: &[AppConfig]) -> Vec<ProcessRecord> {
        let entries = match process::list_processes() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process table");
                return Vec::new();
            }
        };

        apps.iter()
            .filter_map(|app| {
                let record = record_for(app, &entries)?;
                Some(record.with_window_state(window_state_of(&app.name)))
            })
            .collect()
    }
}

/// Record for `app` if any process matches, memory summed over all matches.
pub(crate) fn record_for(app: &AppConfig, entries: &[ProcessEntry]) -> Option<ProcessRecord> {
    let matches = process::find_by_name(entries, &app.process_name);
    let main = matches.first()?;
    let rss_kb: u64 = matches.iter().map(|e| e.rss_kb).sum();
    Some(ProcessRecord::new(&app.name, &app.process_name, main.pid).with_memory_mb(rss_kb / 1024))
}

#[cfg(target_os = "macos")]
fn window_state_of(app_name: &str) -> WindowState {
    let script = format!(
        r#"tell application "System Events"
    tell process {}
        if (count of windows) is 0 then return "normal"
        if value of attribute "AXMinimized" of window 1 then return "minimized"
        if value of attribute "AXFullScreen" of window 1 then return "maximized"
    end tell
end tell
return "normal""#,
        super::applescript::quote(app_name)
    );

    match super::applescript::run(&script).and_then(|out| out.parse()) {
        Ok(state) => state,
        Err(e) => {
            tracing::debug!(app = app_name, error = %e, "window state unavailable");
            WindowState::Normal
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn window_state_of(_app_name: &str) -> WindowState {
    WindowState::Normal
}
