//! Tests for the clean command.

use super::execution::execute_cleanup;
use super::planning::build_cleanup_plan;
use chrono::Utc;
use lockstore::StoreConfig;
use lockstore::locks::{LockMetadata, lock_path_for};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_aged(path: &Path, content: &str, age: Duration) {
    std::fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

fn write_marker(document: &Path, heartbeat_age: chrono::Duration) -> PathBuf {
    let mut meta = LockMetadata::new("crashed-instance");
    meta.heartbeat_at = Utc::now() - heartbeat_age;
    let lock_path = lock_path_for(document);
    std::fs::write(&lock_path, meta.to_json().unwrap()).unwrap();
    lock_path
}

#[tokio::test]
async fn test_plan_separates_old_and_recent_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("board.json");
    std::fs::write(&doc, "{}").unwrap();

    let old = temp_dir.path().join("board.json.a1b2c3.0.tmp");
    let recent = temp_dir.path().join("board.json.d4e5f6.3.tmp");
    write_aged(&old, "{\"partial\"", Duration::from_secs(3600));
    std::fs::write(&recent, "{}").unwrap();
    // Someone else's temp file is not ours to judge
    write_aged(
        &temp_dir.path().join("other.json.a1b2c3.0.tmp"),
        "{}",
        Duration::from_secs(3600),
    );

    let plan = build_cleanup_plan(&doc, &StoreConfig::default()).await.unwrap();

    assert_eq!(plan.orphan_temp_files.len(), 1);
    assert_eq!(plan.orphan_temp_files[0].path, old);
    assert_eq!(plan.recent_temp_files.len(), 1);
    assert_eq!(plan.recent_temp_files[0].path, recent);
    assert!(plan.stale_lock.is_none());
    assert_eq!(plan.candidate_count(), 1);
}

#[tokio::test]
async fn test_plan_includes_only_stale_locks() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("board.json");
    std::fs::write(&doc, "{}").unwrap();
    let config = StoreConfig::default();

    write_marker(&doc, chrono::Duration::seconds(1));
    let plan = build_cleanup_plan(&doc, &config).await.unwrap();
    assert!(plan.stale_lock.is_none());

    write_marker(&doc, chrono::Duration::minutes(10));
    let plan = build_cleanup_plan(&doc, &config).await.unwrap();
    assert!(plan.stale_lock.as_ref().is_some_and(|info| info.is_stale));
    assert_eq!(plan.candidate_count(), 1);
}

#[tokio::test]
async fn test_execute_removes_candidates_and_keeps_document() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("board.json");
    std::fs::write(&doc, "{\"keep\": true}").unwrap();
    let old = temp_dir.path().join("board.json.a1b2c3.0.tmp");
    let recent = temp_dir.path().join("board.json.d4e5f6.3.tmp");
    write_aged(&old, "{", Duration::from_secs(3600));
    std::fs::write(&recent, "{}").unwrap();
    let lock_path = write_marker(&doc, chrono::Duration::minutes(10));

    let config = StoreConfig::default();
    let plan = build_cleanup_plan(&doc, &config).await.unwrap();
    let result = execute_cleanup(&doc, &config, &plan).await.unwrap();

    assert_eq!(result.removed_count, 2);
    assert!(result.skipped.is_empty());
    assert!(!old.exists());
    assert!(!lock_path.exists());
    assert!(recent.exists());
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), "{\"keep\": true}");
}

#[tokio::test]
async fn test_execute_skips_lock_that_came_back_to_life() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("board.json");
    std::fs::write(&doc, "{}").unwrap();
    let lock_path = write_marker(&doc, chrono::Duration::minutes(10));

    let config = StoreConfig::default();
    let plan = build_cleanup_plan(&doc, &config).await.unwrap();
    assert!(plan.stale_lock.is_some());

    // A new holder takes the lock between planning and execution
    write_marker(&doc, chrono::Duration::zero());
    let result = execute_cleanup(&doc, &config, &plan).await.unwrap();

    assert_eq!(result.removed_count, 0);
    assert_eq!(result.skipped.len(), 1);
    assert!(lock_path.exists());
}
