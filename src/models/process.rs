//! Process snapshot types captured at checkpoint time.

use serde::{Deserialize, Serialize};

/// Coarse window arrangement of an application's front window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

impl std::fmt::Display for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowState::Normal => write!(f, "normal"),
            WindowState::Minimized => write!(f, "minimized"),
            WindowState::Maximized => write!(f, "maximized"),
        }
    }
}

impl std::str::FromStr for WindowState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(WindowState::Normal),
            "minimized" => Ok(WindowState::Minimized),
            "maximized" | "zoomed" => Ok(WindowState::Maximized),
            _ => anyhow::bail!(
                "Invalid window state: {s}. Valid values: normal, minimized, maximized"
            ),
        }
    }
}

/// One running monitored application at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Display name from the monitored application list
    pub name: String,
    /// Name used to activate the application and find its process
    pub process_name: String,
    pub pid: u32,
    /// Resident memory in megabytes
    pub memory_mb: u64,
    #[serde(default)]
    pub window_state: WindowState,
    pub is_running: bool,
}

impl ProcessRecord {
    pub fn new(name: impl Into<String>, process_name: impl Into<String>, pid: u32) -> Self {
        Self {
            name: name.into(),
            process_name: process_name.into(),
            pid,
            memory_mb: 0,
            window_state: WindowState::Normal,
            is_running: true,
        }
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_window_state(mut self, window_state: WindowState) -> Self {
        self.window_state = window_state;
        self
    }
}

/// Order records heaviest first. Ties keep their captured order.
pub fn sort_by_memory_desc(records: &[ProcessRecord]) -> Vec<ProcessRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.memory_mb.cmp(&a.memory_mb));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_state_parse_and_display() {
        assert_eq!("minimized".parse::<WindowState>().unwrap(), WindowState::Minimized);
        assert_eq!("Zoomed".parse::<WindowState>().unwrap(), WindowState::Maximized);
        assert!("fullscreen".parse::<WindowState>().is_err());
        assert_eq!(WindowState::Maximized.to_string(), "maximized");
    }

    #[test]
    fn test_sort_by_memory_is_stable() {
        let records = vec![
            ProcessRecord::new("A", "a", 1).with_memory_mb(100),
            ProcessRecord::new("B", "b", 2).with_memory_mb(900),
            ProcessRecord::new("C", "c", 3).with_memory_mb(100),
        ];

        let names: Vec<_> = sort_by_memory_desc(&records)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_window_state_serializes_lowercase() {
        let record = ProcessRecord::new("Safari", "Safari", 42)
            .with_window_state(WindowState::Minimized);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"window_state\":\"minimized\""));
    }
}
