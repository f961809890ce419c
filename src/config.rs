//! Configuration for the sync engine.
//!
//! # Example
//!
//! ```
//! use planner_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.poll_interval_secs, 10);
//!
//! // Full config
//! let config = SyncConfig {
//!     drain_interval_secs: 5,
//!     retry_max_attempts: 3,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::resilience::backoff::RetryPolicy;

/// Configuration for the sync engine. All fields have sensible defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Reachability poll interval in seconds (default: 10)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Periodic drain trigger interval in seconds (default: 30)
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Per-remote-call timeout in milliseconds (default: 10s).
    /// Timeout counts as a transient failure.
    #[serde(default = "default_remote_call_timeout_ms")]
    pub remote_call_timeout_ms: u64,

    /// Retry backoff settings
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,

    /// Failed attempts before an operation is dead-lettered (default: 8)
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Dead-letter buffer capacity; oldest entries are dropped beyond it
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,

    /// Event broadcast channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_poll_interval_secs() -> u64 { 10 }
fn default_drain_interval_secs() -> u64 { 30 }
fn default_remote_call_timeout_ms() -> u64 { 10_000 }
fn default_retry_initial_delay_ms() -> u64 { 500 }
fn default_retry_max_delay_ms() -> u64 { 60_000 }
fn default_retry_factor() -> f64 { 2.0 }
fn default_retry_max_attempts() -> u32 { 8 }
fn default_dead_letter_capacity() -> usize { 256 }
fn default_event_capacity() -> usize { 64 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            drain_interval_secs: default_drain_interval_secs(),
            remote_call_timeout_ms: default_remote_call_timeout_ms(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_factor: default_retry_factor(),
            retry_max_attempts: default_retry_max_attempts(),
            dead_letter_capacity: default_dead_letter_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn remote_call_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_call_timeout_ms)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            factor: self.retry_factor,
            max_attempts: self.retry_max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.drain_interval_secs, 30);
        assert_eq!(config.retry_max_attempts, 8);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SyncConfig = serde_json::from_str(r#"{"drain_interval_secs": 5}"#).unwrap();
        assert_eq!(config.drain_interval_secs, 5);
        assert_eq!(config.poll_interval_secs, 10); // default filled in
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = SyncConfig {
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 1_000,
            retry_max_attempts: 4,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 4);
    }
}
