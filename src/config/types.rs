//! Default values for `StoreConfig` fields.

// Default value functions for serde
pub(crate) fn default_stale_threshold_ms() -> u64 {
    10_000
}
pub(crate) fn default_heartbeat_interval_ms() -> u64 {
    2_000
}
pub(crate) fn default_lock_max_retries() -> u32 {
    10
}
pub(crate) fn default_lock_base_delay_ms() -> u64 {
    50
}
pub(crate) fn default_lock_backoff_factor() -> f64 {
    2.0
}
pub(crate) fn default_lock_max_delay_ms() -> u64 {
    1_000
}
pub(crate) fn default_write_retries() -> u32 {
    3
}
pub(crate) fn default_write_retry_delay_ms() -> u64 {
    100
}
pub(crate) fn default_mutex_timeout_ms() -> u64 {
    30_000
}
pub(crate) fn default_mutex_max_queue_depth() -> usize {
    100
}
