//! Config struct definitions and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a lockstore document.
///
/// Supplied by calling code (or a YAML file for the CLI), not by end users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    // =========================================================================
    // Cross-process lock
    // =========================================================================
    /// A lock whose heartbeat is older than this is presumed abandoned.
    #[serde(default = "default_stale_threshold_ms")]
    pub stale_threshold_ms: u64,

    /// How often a held lock refreshes its heartbeat.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Retries after the first failed acquisition attempt.
    #[serde(default = "default_lock_max_retries")]
    pub lock_max_retries: u32,

    /// Backoff delay before the first retry.
    #[serde(default = "default_lock_base_delay_ms")]
    pub lock_base_delay_ms: u64,

    /// Multiplier applied to the delay on every further retry.
    #[serde(default = "default_lock_backoff_factor")]
    pub lock_backoff_factor: f64,

    /// Upper bound for a single backoff delay.
    #[serde(default = "default_lock_max_delay_ms")]
    pub lock_max_delay_ms: u64,

    // =========================================================================
    // Writes
    // =========================================================================
    /// Total attempts for a `write` before it fails with `WriteFailed`.
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,

    /// Base delay between write attempts; scaled by the attempt number.
    #[serde(default = "default_write_retry_delay_ms")]
    pub write_retry_delay_ms: u64,

    // =========================================================================
    // In-process queue
    // =========================================================================
    /// Longest a queued operation waits for its turn.
    #[serde(default = "default_mutex_timeout_ms")]
    pub mutex_timeout_ms: u64,

    /// Maximum operations queued or running per path.
    #[serde(default = "default_mutex_max_queue_depth")]
    pub mutex_max_queue_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stale_threshold_ms: default_stale_threshold_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            lock_max_retries: default_lock_max_retries(),
            lock_base_delay_ms: default_lock_base_delay_ms(),
            lock_backoff_factor: default_lock_backoff_factor(),
            lock_max_delay_ms: default_lock_max_delay_ms(),
            write_retries: default_write_retries(),
            write_retry_delay_ms: default_write_retry_delay_ms(),
            mutex_timeout_ms: default_mutex_timeout_ms(),
            mutex_max_queue_depth: default_mutex_max_queue_depth(),
        }
    }
}

/// The subset of `StoreConfig` the cross-process lock needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockConfig {
    pub stale_threshold: Duration,
    pub heartbeat_interval: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        StoreConfig::default().lock_config()
    }
}
