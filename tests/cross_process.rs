//! End-to-end tests that run the `lockstore` binary as separate processes.
//!
//! Threads inside one test process share the in-process queue; only real
//! processes prove that the lock marker alone keeps writers apart.

use serde_json::{Value, json};
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use tempfile::TempDir;

fn lockstore_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lockstore"))
}

/// Short timings with a generous retry budget for heavy contention.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("store.yaml");
    std::fs::write(
        &path,
        "stale_threshold_ms: 5000\n\
         heartbeat_interval_ms: 500\n\
         lock_max_retries: 400\n\
         lock_base_delay_ms: 5\n\
         lock_backoff_factor: 1.5\n\
         lock_max_delay_ms: 50\n",
    )
    .unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(lockstore_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run lockstore")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
#[serial]
fn concurrent_incr_processes_lose_no_updates() {
    const PROCESSES: usize = 4;
    const INCREMENTS: usize = 5;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let doc = temp_dir.path().join("counter.json");
    let doc_arg = doc.to_str().unwrap().to_string();

    let workers: Vec<_> = (0..PROCESSES)
        .map(|_| {
            let config = config.clone();
            let doc_arg = doc_arg.clone();
            thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    let out = run(&config, &["incr", &doc_arg, "hits"]);
                    assert!(
                        out.status.success(),
                        "incr failed: {}",
                        String::from_utf8_lossy(&out.stderr)
                    );
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(read_json(&doc), json!({"hits": PROCESSES * INCREMENTS}));
    assert!(!temp_dir.path().join("counter.json.lock").exists());
}

#[test]
#[serial]
fn write_then_read_round_trips_through_processes() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let doc = temp_dir.path().join("doc.json");
    let doc_arg = doc.to_str().unwrap();

    let out = run(&config, &["write", doc_arg, r#"{"a": 1}"#]);
    assert!(out.status.success());
    let out = run(&config, &["write", doc_arg, r#"{"b": 2}"#]);
    assert!(out.status.success());

    let out = run(&config, &["read", doc_arg]);
    assert!(out.status.success());
    let printed: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(printed, json!({"b": 2}));
}

#[test]
#[serial]
fn read_missing_document_prints_null_or_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let doc = temp_dir.path().join("missing.json");
    let doc_arg = doc.to_str().unwrap();

    let out = run(&config, &["read", doc_arg]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "null");

    let out = run(&config, &["read", doc_arg, "--default", r#"{"count": 0}"#]);
    assert!(out.status.success());
    let printed: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(printed, json!({"count": 0}));
}

#[test]
#[serial]
fn corrupt_document_exits_with_data_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let doc = temp_dir.path().join("broken.json");
    std::fs::write(&doc, "{ not json").unwrap();

    let out = run(&config, &["read", doc.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to parse"));
}

#[test]
#[serial]
fn live_foreign_lock_exits_with_lock_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("impatient.yaml");
    std::fs::write(&config_path, "lock_max_retries: 2\nlock_base_delay_ms: 5\n").unwrap();
    let doc = temp_dir.path().join("held.json");
    std::fs::write(&doc, "{}").unwrap();

    let marker = json!({
        "owner": "someone@elsewhere",
        "pid": 4242,
        "instance": "other-process",
        "token": "held-token",
        "acquired_at": chrono::Utc::now().to_rfc3339(),
        "heartbeat_at": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(temp_dir.path().join("held.json.lock"), marker.to_string()).unwrap();

    let out = run(&config_path, &["read", doc.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(4));

    let out = run(&config_path, &["lock", doc.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("someone@elsewhere"));
}

#[test]
#[serial]
fn invalid_json_argument_is_user_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let doc = temp_dir.path().join("doc.json");

    let out = run(&config, &["set", doc.to_str().unwrap(), "k", "{oops"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!doc.exists());
}
