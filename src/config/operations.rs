//! Config loading, validation, and derived views.

use super::model::{LockConfig, StoreConfig};
use crate::error::{Result, StoreError};
use std::path::Path;
use std::time::Duration;

impl StoreConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::io(
                format!("failed to read config file '{}'", path.display()),
                e,
            )
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: StoreConfig = serde_yaml::from_str(yaml)
            .map_err(|e| StoreError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StoreError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `stale_threshold_ms` must be positive
    /// - `heartbeat_interval_ms` must be positive and below `stale_threshold_ms`
    /// - `lock_backoff_factor` must be at least 1.0
    /// - `lock_base_delay_ms` must not exceed `lock_max_delay_ms`
    /// - `write_retries`, `mutex_timeout_ms`, `mutex_max_queue_depth` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.stale_threshold_ms == 0 {
            return Err(StoreError::Config(
                "stale_threshold_ms must be greater than 0".to_string(),
            ));
        }

        if self.heartbeat_interval_ms == 0 || self.heartbeat_interval_ms >= self.stale_threshold_ms
        {
            return Err(StoreError::Config(format!(
                "heartbeat_interval_ms ({}) must be greater than 0 and less than stale_threshold_ms ({})",
                self.heartbeat_interval_ms, self.stale_threshold_ms
            )));
        }

        if !self.lock_backoff_factor.is_finite() || self.lock_backoff_factor < 1.0 {
            return Err(StoreError::Config(format!(
                "lock_backoff_factor must be at least 1.0 (found {})",
                self.lock_backoff_factor
            )));
        }

        if self.lock_base_delay_ms > self.lock_max_delay_ms {
            return Err(StoreError::Config(format!(
                "lock_base_delay_ms ({}) must not exceed lock_max_delay_ms ({})",
                self.lock_base_delay_ms, self.lock_max_delay_ms
            )));
        }

        if self.write_retries == 0 {
            return Err(StoreError::Config(
                "write_retries must be greater than 0".to_string(),
            ));
        }

        if self.mutex_timeout_ms == 0 {
            return Err(StoreError::Config(
                "mutex_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.mutex_max_queue_depth == 0 {
            return Err(StoreError::Config(
                "mutex_max_queue_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Acquisition settings for the cross-process lock.
    pub fn lock_config(&self) -> LockConfig {
        LockConfig {
            stale_threshold: Duration::from_millis(self.stale_threshold_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            max_retries: self.lock_max_retries,
            base_delay: Duration::from_millis(self.lock_base_delay_ms),
            backoff_factor: self.lock_backoff_factor,
            max_delay: Duration::from_millis(self.lock_max_delay_ms),
        }
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    pub fn mutex_timeout(&self) -> Duration {
        Duration::from_millis(self.mutex_timeout_ms)
    }

    /// Delay before retrying a write after the given 1-based attempt failed.
    pub fn write_retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.write_retry_delay_ms.saturating_mul(attempt as u64))
    }
}
