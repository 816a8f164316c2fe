//! `relaunch start [--foreground]`
//!
//! Without `--foreground` the command re-executes itself in a new process
//! group and returns once the child has survived start-up.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use wait_timeout::ChildExt;

use super::common;
use crate::fs::DataDir;
use crate::monitor::state::ActionReport;
use crate::monitor::{HandledState, HeartbeatStore, SystemMonitor, SystemStateDetector};
use crate::platform::{HostProbe, LogNotifier, SystemProbe};
use crate::process::is_process_alive;
use crate::startup::{check_permissions, restart_with_backoff, RestartPolicy};

/// How long a freshly spawned daemon must stay up to count as started
const STARTUP_GRACE: Duration = Duration::from_secs(3);

pub fn execute(foreground: bool) -> Result<()> {
    let data_dir = common::data_dir()?;
    if foreground {
        run_foreground(&data_dir)
    } else {
        start_background(&data_dir)
    }
}

fn start_background(data_dir: &DataDir) -> Result<()> {
    if let Some(pid) = data_dir.recorded_pid().filter(|pid| is_process_alive(*pid)) {
        println!("{} relaunch is already running (PID: {pid})", "─".dimmed());
        return Ok(());
    }

    if let Err(e) = spawn_daemon() {
        tracing::warn!(error = %e, "daemon failed to start, retrying with backoff");
        println!("{} {e:#}; retrying", "!".yellow().bold());
        restart_with_backoff(&RestartPolicy::default(), spawn_daemon)?;
    }

    println!("{} relaunch started", "✓".green().bold());
    println!();
    println!("  {}  Check status", "relaunch status".cyan());
    println!("  {}  Pause checkpoints", "relaunch pause".cyan());
    Ok(())
}

fn spawn_daemon() -> Result<()> {
    let executable = std::env::current_exe().context("Failed to locate executable")?;
    let mut child = Command::new(executable)
        .args(["start", "--foreground"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .context("Failed to spawn daemon")?;

    match child
        .wait_timeout(STARTUP_GRACE)
        .context("Failed to wait for daemon")?
    {
        None => {
            tracing::info!(pid = child.id(), "daemon spawned");
            Ok(())
        }
        Some(status) => bail!("daemon exited during start-up ({status})"),
    }
}

fn run_foreground(data_dir: &DataDir) -> Result<()> {
    let mut startup = common::startup_manager(data_dir, Arc::new(LogNotifier::new(false)))?;
    let _instance = startup.acquire_instance()?;

    let init_dir = data_dir.clone();
    let manager = startup.start_with_policy(move || {
        check_permissions(&init_dir)?;
        let config = common::load_config(&init_dir)?;
        common::checkpoint_manager(&init_dir, config)
    })?;

    let probe: Arc<dyn SystemProbe> = Arc::new(HostProbe::new());
    let detector = SystemStateDetector::new(
        HeartbeatStore::new(&data_dir.heartbeat_path()),
        Arc::clone(&probe),
    );
    let state = detector.detect();
    let handled = detector.handle_state(state, &manager, startup.crash_tracker());
    log_handled(&handled);

    let monitor = SystemMonitor::new(data_dir.clone(), Arc::new(manager), probe);
    let signal = monitor.shutdown_signal();
    ctrlc::set_handler(move || signal.trigger()).context("Failed to install signal handler")?;

    monitor.run();
    tracing::info!("relaunch stopped");
    Ok(())
}

fn log_handled(handled: &HandledState) {
    match &handled.result {
        Ok(ActionReport::Restored(outcome)) => tracing::info!(
            state = %handled.state,
            checkpoint = %outcome.checkpoint_id,
            restored = outcome.summary.successful,
            failed = outcome.summary.failed,
            skipped = outcome.skipped.len(),
            "restored after start-up"
        ),
        Ok(report) => tracing::info!(state = %handled.state, ?report, "start-up action done"),
        Err(e) => tracing::error!(state = %handled.state, error = %e, "start-up action failed"),
    }
}
