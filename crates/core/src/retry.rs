//! Retry policy for leaf steps that perform I/O.
//!
//! The composition engine itself never retries; a leaf opts in through an
//! optional `retry` block in its configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Default maximum number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay before the second attempt in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Default upper bound of a single delay in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10000;

/// Exponential backoff settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before the second attempt in milliseconds (default: 500ms)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum delay between attempts in milliseconds (default: 10000ms)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryConfig {
    /// Delays between attempts, doubling from `initial_backoff_ms` up to `max_backoff_ms`.
    ///
    /// Yields `max_attempts - 1` delays since the first attempt runs immediately.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor((self.initial_backoff_ms / 2).max(1))
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .take(self.max_attempts.saturating_sub(1))
    }
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
        assert_eq!(config.max_backoff_ms, DEFAULT_MAX_BACKOFF_MS);
    }

    #[test]
    fn test_strategy_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 300,
        };
        let delays: Vec<Duration> = config.strategy().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        let config = RetryConfig {
            max_attempts: 1,
            ..Default::default()
        };
        assert_eq!(config.strategy().count(), 0);
    }
}
