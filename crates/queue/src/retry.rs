//! Retry policy and dead letters.

#![allow(missing_docs)]

use std::time::Duration;

use chrono::{DateTime, Utc};
use fedsync_common::config::DeliveryConfig;

/// Exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor between retries.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

impl From<&DeliveryConfig> for RetryConfig {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Whether another attempt follows `attempt` failed ones.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// A job that exhausted its retries.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry<T> {
    pub job: T,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

impl<T> DeadLetterEntry<T> {
    #[must_use]
    pub fn new(job: T, attempts: u32, error: String) -> Self {
        Self {
            job,
            attempts,
            last_error: error,
            failed_at: Utc::now(),
        }
    }
}
