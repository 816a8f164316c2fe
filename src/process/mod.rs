//! Process table queries.
//!
//! Liveness uses the null signal; name lookups parse `ps` output, which is
//! available in the same form on macOS and Linux.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::io;
use std::path::Path;
use std::process::Command;

/// Check whether a process with the given PID exists.
///
/// Sends signal 0, which performs the permission and existence checks
/// without delivering anything:
/// - `Ok(())`: the process exists and we may signal it
/// - `EPERM`: the process exists but belongs to someone else
/// - `ESRCH`: no such process
///
/// PID 0 would address our own process group, so it is never reported alive.
pub fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// One row of `ps -axo pid=,rss=,comm=`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Resident set size in KiB
    pub rss_kb: u64,
    /// Executable path or name as reported by `ps`
    pub command: String,
}

impl ProcessEntry {
    /// True when the executable's file name is `process_name`.
    ///
    /// `ps` reports a full path on macOS and a (possibly truncated) name on
    /// Linux, so both forms are accepted.
    pub fn matches(&self, process_name: &str) -> bool {
        if self.command == process_name {
            return true;
        }
        Path::new(&self.command)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == process_name)
    }
}

/// Parse `ps -axo pid=,rss=,comm=` output. Malformed rows are skipped.
pub fn parse_ps_output(output: &str) -> Vec<ProcessEntry> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, rest) = line.split_once(char::is_whitespace)?;
            let rest = rest.trim_start();
            let (rss, command) = rest.split_once(char::is_whitespace)?;
            Some(ProcessEntry {
                pid: pid.parse().ok()?,
                rss_kb: rss.parse().ok()?,
                command: command.trim().to_string(),
            })
        })
        .collect()
}

/// Snapshot of the whole process table.
pub fn list_processes() -> io::Result<Vec<ProcessEntry>> {
    let output = Command::new("ps").args(["-axo", "pid=,rss=,comm="]).output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!("ps exited with: {}", output.status)));
    }
    Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout)))
}

/// All entries whose executable is `process_name`, lowest PID first.
pub fn find_by_name<'a>(entries: &'a [ProcessEntry], process_name: &str) -> Vec<&'a ProcessEntry> {
    let mut matches: Vec<_> = entries.iter().filter(|e| e.matches(process_name)).collect();
    matches.sort_by_key(|e| e.pid);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_nonexistent_process_is_not_alive() {
        assert!(!is_process_alive(999_999_999));
    }

    #[test]
    fn test_pid_zero_is_not_alive() {
        assert!(!is_process_alive(0));
    }

    #[test]
    fn test_u32_max_is_not_alive() {
        assert!(!is_process_alive(u32::MAX));
    }

    #[test]
    fn test_parse_ps_output() {
        let output = "\
    1   1234 /sbin/launchd
  512 204800 /Applications/Google Chrome.app/Contents/MacOS/Google Chrome
  900   4096 firefox
garbage line
";
        let entries = parse_ps_output(output);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].pid, 512);
        assert_eq!(entries[1].rss_kb, 204_800);
        assert_eq!(
            entries[1].command,
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
        );
    }

    #[test]
    fn test_matches_path_and_bare_name() {
        let entries = parse_ps_output(
            " 20 10 /Applications/Preview.app/Contents/MacOS/Preview\n 10 10 Preview\n 30 10 PreviewHelper\n",
        );
        let found = find_by_name(&entries, "Preview");
        assert_eq!(found.iter().map(|e| e.pid).collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn test_list_processes_includes_self() {
        let entries = list_processes().unwrap();
        let me = std::process::id();
        assert!(entries.iter().any(|e| e.pid == me));
    }
}
