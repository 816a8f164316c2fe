//! Default [`AppController`]: `open -a` on macOS, a detached PATH spawn
//! elsewhere. Activation is bounded by a timeout so a wedged launcher cannot
//! stall a restoration.

use anyhow::{bail, Context, Result};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

use super::AppController;
use crate::models::WindowState;
use crate::process;

#[derive(Debug, Clone)]
pub struct SystemController {
    launch_timeout: Duration,
}

impl SystemController {
    pub fn new(launch_timeout: Duration) -> Self {
        Self { launch_timeout }
    }

    pub fn launch_timeout(&self) -> Duration {
        self.launch_timeout
    }
}

impl AppController for SystemController {
    fn open_application(&self, process_name: &str) -> Result<()> {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg("-a").arg(process_name);
            run_bounded(command, self.launch_timeout)
                .with_context(|| format!("Failed to open {process_name}"))
        } else {
            spawn_detached(process_name)
        }
    }

    fn find_process(&self, process_name: &str) -> Option<u32> {
        match process::list_processes() {
            Ok(entries) => process::find_by_name(&entries, process_name)
                .first()
                .map(|e| e.pid),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process table");
                None
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn set_window_state(&self, process_name: &str, state: WindowState) -> Result<()> {
        match window_state_script(process_name, state) {
            Some(script) => super::applescript::run(&script).map(|_| ()),
            None => Ok(()),
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn set_window_state(&self, _process_name: &str, state: WindowState) -> Result<()> {
        if state == WindowState::Normal {
            return Ok(());
        }
        bail!("window state control is not supported on this platform")
    }
}

/// System Events script that minimizes or zooms the first window of
/// `process_name`. Zooming keeps the window on the current Space.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn window_state_script(process_name: &str, state: WindowState) -> Option<String> {
    let action = match state {
        WindowState::Normal => return None,
        WindowState::Minimized => "set minimized of window 1 to true",
        WindowState::Maximized => "set zoomed of window 1 to true",
    };
    Some(format!(
        r#"tell application "System Events"
    tell application process {}
        if exists window 1 then
            {action}
        end if
    end tell
end tell"#,
        super::applescript::quote(process_name)
    ))
}

/// Run a command to completion, killing it once `timeout` elapses.
fn run_bounded(mut command: Command, timeout: Duration) -> Result<()> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn activation command")?;

    match child.wait_timeout(timeout).context("Failed to wait for activation")? {
        Some(status) if status.success() => Ok(()),
        Some(status) => {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                use std::io::Read;
                let _ = pipe.read_to_string(&mut stderr);
            }
            bail!("activation exited with {status}: {}", stderr.trim())
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            bail!("activation timed out after {}s", timeout.as_secs())
        }
    }
}

/// Resolve `app_name` on PATH (as given, then lowercased) and start it
/// without waiting for it to exit.
fn spawn_detached(app_name: &str) -> Result<()> {
    let executable = which::which(app_name)
        .or_else(|_| which::which(app_name.to_lowercase()))
        .or_else(|_| which::which(app_name.to_lowercase().replace(' ', "-")))
        .with_context(|| format!("{app_name} not found on PATH"))?;

    let child = Command::new(&executable)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start {}", executable.display()))?;
    reap_in_background(child)?;
    Ok(())
}

/// Wait for `child` on a detached thread so it is reaped when it exits
/// instead of lingering as a zombie of the daemon.
fn reap_in_background(mut child: Child) -> Result<thread::JoinHandle<()>> {
    let pid = child.id();
    thread::Builder::new()
        .name(format!("relaunch-reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "launched application exited"),
            Err(e) => tracing::warn!(pid, error = %e, "failed to reap launched application"),
        })
        .context("Failed to spawn reaper thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_bounded_success_and_failure() {
        assert!(run_bounded(Command::new("true"), Duration::from_secs(5)).is_ok());

        let err = run_bounded(Command::new("false"), Duration::from_secs(5)).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_run_bounded_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let err = run_bounded(command, Duration::from_millis(100)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_reaped_child_leaves_no_zombie() {
        use nix::errno::Errno;
        use nix::sys::wait::{waitpid, WaitPidFlag};
        use nix::unistd::Pid;

        let child = Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        reap_in_background(child).unwrap().join().unwrap();

        // already collected, so there is nothing left to wait for
        assert_eq!(waitpid(pid, Some(WaitPidFlag::WNOHANG)), Err(Errno::ECHILD));
    }

    #[test]
    fn test_window_state_scripts() {
        assert_eq!(window_state_script("firefox", WindowState::Normal), None);

        let zoom = window_state_script("firefox", WindowState::Maximized).unwrap();
        assert!(zoom.contains(r#"tell application process "firefox""#));
        assert!(zoom.contains("set zoomed of window 1 to true"));
        assert!(!zoom.contains("AXFullScreen"));

        let minimize = window_state_script("Preview", WindowState::Minimized).unwrap();
        assert!(minimize.contains("set minimized of window 1 to true"));
    }

    #[test]
    fn test_spawn_detached_unknown_app() {
        assert!(spawn_detached("definitely-not-an-installed-app-xyz").is_err());
    }
}
