//! Exponential backoff between lock acquisition attempts.

use crate::config::LockConfig;
use rand::Rng;
use std::time::Duration;

/// Delay schedule `min(base * factor^retry, cap)`, jittered downward.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    factor: f64,
    cap: Duration,
}

impl Backoff {
    pub fn new(base: Duration, factor: f64, cap: Duration) -> Self {
        Self { base, factor, cap }
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self::new(config.base_delay, config.backoff_factor, config.max_delay)
    }

    /// Un-jittered delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let scaled_nanos = (self.base.as_nanos() as f64 * self.factor.powi(exponent)).round();
        if !scaled_nanos.is_finite() || scaled_nanos >= self.cap.as_nanos() as f64 {
            return self.cap;
        }
        Duration::from_nanos(scaled_nanos as u64)
    }

    /// `delay(retry)` scaled by a random factor in `[0.75, 1.0]`.
    ///
    /// Contending processes that started together drift apart instead of
    /// retrying in lockstep, and the cap still holds.
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let factor: f64 = rand::rng().random_range(0.75..=1.0);
        self.delay(retry).mul_f64(factor)
    }
}
