use crate::config::{LockConfig, StoreConfig};
use crate::locks::LockMetadata;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Short timings so contention and staleness play out in milliseconds.
pub(crate) fn fast_config() -> StoreConfig {
    StoreConfig {
        stale_threshold_ms: 1_000,
        heartbeat_interval_ms: 100,
        lock_max_retries: 200,
        lock_base_delay_ms: 2,
        lock_backoff_factor: 1.5,
        lock_max_delay_ms: 20,
        write_retries: 3,
        write_retry_delay_ms: 5,
        mutex_timeout_ms: 30_000,
        mutex_max_queue_depth: 1_000,
    }
}

pub(crate) fn fast_lock_config() -> LockConfig {
    fast_config().lock_config()
}

/// A lock config that gives up after `retries` quick retries.
pub(crate) fn impatient_lock_config(retries: u32) -> LockConfig {
    LockConfig {
        max_retries: retries,
        ..fast_lock_config()
    }
}

pub(crate) fn document_path(dir: &TempDir) -> PathBuf {
    dir.path().join("state.json")
}

/// Write a marker on behalf of some other holder whose last heartbeat was at `heartbeat_at`.
pub(crate) fn write_foreign_marker(lock_path: &Path, heartbeat_at: DateTime<Utc>) -> LockMetadata {
    let mut meta = LockMetadata::new("foreign-instance");
    meta.pid = 999_999;
    meta.acquired_at = heartbeat_at;
    meta.heartbeat_at = heartbeat_at;
    std::fs::write(lock_path, meta.to_json().unwrap()).unwrap();
    meta
}
