//! Default [`SystemProbe`] reading `/proc` and `/sys` on Linux and `sysctl`
//! / `pmset` on macOS. Anything that cannot be read is reported as `None`.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::{applescript, BatteryStatus, SystemProbe};
use crate::process;

#[derive(Debug, Default, Clone)]
pub struct HostProbe;

impl HostProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SystemProbe for HostProbe {
    fn uptime(&self) -> Option<Duration> {
        if cfg!(target_os = "macos") {
            let boot = parse_boottime(&sysctl("kern.boottime")?)?;
            let now = chrono::Utc::now().timestamp();
            u64::try_from(now - boot).ok().map(Duration::from_secs)
        } else {
            parse_proc_uptime(&fs::read_to_string("/proc/uptime").ok()?)
        }
    }

    fn is_process_alive(&self, pid: u32) -> bool {
        process::is_process_alive(pid)
    }

    fn cpu_load(&self) -> Option<f64> {
        let load = if cfg!(target_os = "macos") {
            parse_loadavg(&sysctl("vm.loadavg")?)?
        } else {
            parse_loadavg(&fs::read_to_string("/proc/loadavg").ok()?)?
        };
        let cpus = std::thread::available_parallelism().ok()?.get() as f64;
        Some((load / cpus * 100.0).min(100.0))
    }

    fn battery(&self) -> Option<BatteryStatus> {
        if cfg!(target_os = "macos") {
            let output = Command::new("pmset").args(["-g", "batt"]).output().ok()?;
            parse_pmset(&String::from_utf8_lossy(&output.stdout))
        } else {
            read_power_supply(Path::new("/sys/class/power_supply"))
        }
    }
}

/// Whether System Events answers window queries, i.e. accessibility access
/// is granted. Other platforms need no such grant.
pub fn accessibility_granted() -> bool {
    if !cfg!(target_os = "macos") {
        return true;
    }
    let script = r#"tell application "System Events"
    try
        set x to every window
        return true
    on error
        return false
    end try
end tell"#;
    matches!(applescript::run(script).as_deref(), Ok("true"))
}

fn sysctl(name: &str) -> Option<String> {
    let output = Command::new("sysctl").args(["-n", name]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).to_string())
}

/// `/proc/uptime`: "<seconds since boot> <idle seconds>"
fn parse_proc_uptime(content: &str) -> Option<Duration> {
    let secs: f64 = content.split_whitespace().next()?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

/// `kern.boottime`: "{ sec = 1700000000, usec = 12345 } Tue Nov 14 ..."
fn parse_boottime(content: &str) -> Option<i64> {
    let rest = content.split("sec =").nth(1)?;
    rest.trim_start()
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

/// First field of `/proc/loadavg` or `vm.loadavg` ("{ 1.52 1.61 1.70 }")
fn parse_loadavg(content: &str) -> Option<f64> {
    content
        .split_whitespace()
        .find(|field| *field != "{")?
        .parse()
        .ok()
}

/// `pmset -g batt` output. `None` on machines without a battery.
fn parse_pmset(content: &str) -> Option<BatteryStatus> {
    let on_ac_power = content.contains("'AC Power'");
    let percent = content
        .lines()
        .filter(|line| line.contains("InternalBattery"))
        .find_map(|line| {
            let end = line.find('%')?;
            let start = line[..end]
                .rfind(|c: char| !c.is_ascii_digit())
                .map_or(0, |i| i + 1);
            line[start..end].parse().ok()
        })?;
    Some(BatteryStatus {
        percent,
        on_ac_power,
    })
}

/// Scan a power_supply class directory for a battery and a mains adapter.
fn read_power_supply(dir: &Path) -> Option<BatteryStatus> {
    let mut percent = None;
    let mut on_ac_power = false;

    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        let kind = fs::read_to_string(path.join("type")).unwrap_or_default();
        match kind.trim() {
            "Battery" if percent.is_none() => {
                percent = fs::read_to_string(path.join("capacity"))
                    .ok()
                    .and_then(|c| c.trim().parse::<u8>().ok());
            }
            "Mains" => {
                on_ac_power |= fs::read_to_string(path.join("online"))
                    .map(|v| v.trim() == "1")
                    .unwrap_or(false);
            }
            _ => {}
        }
    }

    percent.map(|percent| BatteryStatus {
        percent,
        on_ac_power,
    })
}
