//! Create, list, maintain and restore checkpoints through the manager.

use chrono::{Duration, Timelike, Utc};
use std::fs;

use relaunch::Error;

use super::helpers::*;

#[test]
fn test_checkpoint_then_restore_after_apps_quit() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    env.desktop.start("TextEdit", 50);
    env.desktop.start("Preview", 300);
    let manager = env.manager();

    let checkpoint = manager.create_checkpoint().expect("checkpoint");
    assert_eq!(checkpoint.app_count(), 3);

    let list = manager.get_available_checkpoints().unwrap();
    assert_eq!(list.total_count, 1);
    assert_eq!(list.latest().unwrap().id, checkpoint.id);

    env.desktop.quit_all();
    let outcome = manager.restore_latest_checkpoint().expect("restore");

    assert_eq!(env.desktop.launched(), vec!["Safari", "Preview", "TextEdit"]);
    assert_eq!(outcome.summary.successful, 3);
    assert!(outcome.skipped.is_empty());
    assert_eq!(
        manager.get_available_checkpoints().unwrap().last_used,
        Some(checkpoint.id)
    );
}

#[test]
fn test_restore_leaves_running_apps_alone() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    env.desktop.start("Terminal", 100);
    let manager = env.manager();
    manager.create_checkpoint().unwrap();

    env.desktop.quit_all();
    env.desktop.start("Terminal", 100);
    let outcome = manager.restore_latest_checkpoint().unwrap();

    assert_eq!(outcome.skipped, vec!["Terminal"]);
    assert_eq!(env.desktop.launched(), vec!["Safari"]);
}

#[test]
fn test_failed_app_does_not_stop_restoration() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    env.desktop.start("Preview", 300);
    let manager = env.manager();
    manager.create_checkpoint().unwrap();

    env.desktop.quit_all();
    env.desktop.break_app("Safari");
    let outcome = manager.restore_latest_checkpoint().unwrap();

    assert_eq!(outcome.summary.successful, 1);
    assert_eq!(outcome.summary.failed_apps, vec!["Safari"]);
    let failed = &outcome.results[0];
    assert_eq!(failed.retry_count, 2);
    assert!(failed.error.as_deref().unwrap().starts_with("Failed after 2 attempts"));
    assert!(env.desktop.is_running("Preview"));
}

#[test]
fn test_restore_errors() {
    let env = TestEnv::new();
    let manager = env.manager();

    assert!(matches!(
        manager.restore_latest_checkpoint(),
        Err(Error::NoCheckpoints)
    ));
    assert!(matches!(
        manager.restore_from_checkpoint("2020-01-01_00-00-00"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_same_second_checkpoint_is_rejected() {
    let env = TestEnv::new();
    let manager = env.manager();
    let now = Utc::now();

    manager.create_checkpoint_at(now).unwrap();
    assert!(matches!(
        manager.create_checkpoint_at(now),
        Err(Error::IdCollision(_))
    ));
}

#[test]
fn test_tampered_checkpoint_is_not_restored() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    let manager = env.manager();
    let checkpoint = manager.create_checkpoint().unwrap();

    let path = manager.storage().record_path(&checkpoint.id);
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(b" ");
    fs::write(&path, bytes).unwrap();

    env.desktop.quit_all();
    assert!(matches!(
        manager.restore_from_checkpoint(&checkpoint.id),
        Err(Error::Integrity { .. })
    ));
    assert!(env.desktop.launched().is_empty());
}

#[test]
fn test_maintenance_compresses_old_checkpoints_that_still_restore() {
    let env = TestEnv::new();
    env.desktop.start("Safari", 800);
    let manager = env.manager();
    let now = Utc::now().with_nanosecond(0).unwrap();

    let old = manager.create_checkpoint_at(now - Duration::days(3)).unwrap();
    let recent = manager.create_checkpoint_at(now).unwrap();

    let report = manager.perform_maintenance_tasks_at(now);
    assert!(report.is_clean(), "errors: {:?}", report.errors);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.compressed, vec![old.id.clone()]);

    let list = manager.get_available_checkpoints().unwrap();
    assert_eq!(list.compressed_count, 1);
    assert!(!list.get(&recent.id).unwrap().is_compressed);
    assert!(!manager.storage().record_path(&old.id).exists());

    env.desktop.quit_all();
    let outcome = manager.restore_from_checkpoint(&old.id).unwrap();
    assert_eq!(outcome.summary.successful, 1);

    let again = manager.perform_maintenance_tasks_at(now);
    assert!(again.compressed.is_empty());
}
