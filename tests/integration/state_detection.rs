//! Start-up state detection and the action each state triggers.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use relaunch::monitor::{
    ActionReport, CrashTracker, Heartbeat, HeartbeatReading, HeartbeatStore, StartupAction,
    SystemState, SystemStateDetector,
};
use relaunch::Error;

use super::helpers::*;

const HOUR: u64 = 3600;

fn detector(env: &TestEnv, probe: StubProbe) -> SystemStateDetector {
    SystemStateDetector::new(
        HeartbeatStore::new(&env.data_dir.heartbeat_path()),
        Arc::new(probe),
    )
}

fn write_heartbeat(env: &TestEnv, minutes_ago: i64, pid: u32) {
    let heartbeat = Heartbeat::at(Utc::now() - ChronoDuration::minutes(minutes_ago), pid);
    HeartbeatStore::new(&env.data_dir.heartbeat_path())
        .write(&heartbeat)
        .unwrap();
}

fn crash_tracker(env: &TestEnv) -> CrashTracker {
    CrashTracker::load(&env.data_dir.crash_state_path())
}

fn seeded_env() -> TestEnv {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    env.desktop.start("Preview", 300);
    env.manager().create_checkpoint().unwrap();
    env.desktop.quit_all();
    env
}

#[test]
fn test_first_run_creates_initial_checkpoint() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    let manager = env.manager();
    let detector = detector(&env, StubProbe::default());

    let state = detector.detect();
    assert_eq!(state, SystemState::FirstRun);

    let handled = detector.handle_state(state, &manager, &mut crash_tracker(&env));
    assert_eq!(handled.action, StartupAction::CreateInitialCheckpoint);
    assert!(matches!(handled.result, Ok(ActionReport::CheckpointCreated(_))));
    assert_eq!(manager.get_available_checkpoints().unwrap().total_count, 1);
    assert!(matches!(
        HeartbeatStore::new(&env.data_dir.heartbeat_path()).read(),
        HeartbeatReading::Present(_)
    ));
}

#[test]
fn test_restart_restores_latest() {
    let env = seeded_env();
    write_heartbeat(&env, 90, 4242);
    let detector = detector(
        &env,
        StubProbe {
            uptime: Some(Duration::from_secs(120)),
            ..Default::default()
        },
    );

    let state = detector.detect();
    assert_eq!(state, SystemState::Restart);

    let handled = detector.handle_state(state, &env.manager(), &mut crash_tracker(&env));
    match handled.result {
        Ok(ActionReport::Restored(outcome)) => assert_eq!(outcome.summary.successful, 2),
        other => panic!("expected restoration, got {other:?}"),
    }
    assert_eq!(env.desktop.launched(), vec!["Safari", "Preview"]);
}

#[test]
fn test_restart_without_auto_restore_skips() {
    let env = seeded_env();
    let mut config = env.config();
    config.auto_restore = false;
    let detector = detector(&env, StubProbe::default());

    let handled = detector.handle_state(
        SystemState::Restart,
        &env.manager_with(config),
        &mut crash_tracker(&env),
    );
    assert!(matches!(handled.result, Ok(ActionReport::RestoreSkipped)));
    assert!(env.desktop.launched().is_empty());
}

#[test]
fn test_crash_records_crash_then_restores() {
    let env = seeded_env();
    write_heartbeat(&env, 30, 4242);
    let detector = detector(
        &env,
        StubProbe {
            uptime: Some(Duration::from_secs(10 * HOUR)),
            alive: vec![],
        },
    );

    let state = detector.detect();
    assert_eq!(state, SystemState::Crash);

    let mut tracker = crash_tracker(&env);
    let handled = detector.handle_state(state, &env.manager(), &mut tracker);
    assert!(matches!(handled.result, Ok(ActionReport::Restored(_))));
    assert_eq!(crash_tracker(&env).recent_crashes(Utc::now()), 1);
    assert_eq!(env.desktop.launched().len(), 2);
}

#[test]
fn test_sleep_only_refreshes_heartbeat() {
    let env = seeded_env();
    write_heartbeat(&env, 5 * 60, 4242);
    let detector = detector(
        &env,
        StubProbe {
            uptime: Some(Duration::from_secs(48 * HOUR)),
            ..Default::default()
        },
    );

    let state = detector.detect();
    assert_eq!(state, SystemState::Sleep);

    let handled = detector.handle_state(state, &env.manager(), &mut crash_tracker(&env));
    assert!(matches!(handled.result, Ok(ActionReport::HeartbeatRefreshed)));
    assert!(env.desktop.launched().is_empty());

    match HeartbeatStore::new(&env.data_dir.heartbeat_path()).read() {
        HeartbeatReading::Present(hb) => assert!(hb.gap(Utc::now()) < Duration::from_secs(60)),
        other => panic!("unexpected heartbeat: {other:?}"),
    }
}

#[test]
fn test_clean_shutdown_is_not_a_crash() {
    let env = seeded_env();
    let heartbeat = Heartbeat::at(Utc::now() - ChronoDuration::minutes(30), 4242).with_clean_shutdown();
    HeartbeatStore::new(&env.data_dir.heartbeat_path())
        .write(&heartbeat)
        .unwrap();
    let detector = detector(
        &env,
        StubProbe {
            uptime: Some(Duration::from_secs(10 * HOUR)),
            alive: vec![],
        },
    );

    assert_eq!(detector.detect(), SystemState::Normal);
}

#[test]
fn test_failed_action_keeps_detected_state() {
    let env = TestEnv::new();
    write_heartbeat(&env, 90, 4242);
    let detector = detector(
        &env,
        StubProbe {
            uptime: Some(Duration::from_secs(60)),
            ..Default::default()
        },
    );

    let state = detector.detect();
    let handled = detector.handle_state(state, &env.manager(), &mut crash_tracker(&env));
    assert_eq!(handled.state, SystemState::Restart);
    assert!(matches!(handled.result, Err(Error::NoCheckpoints)));
}
