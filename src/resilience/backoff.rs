// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-operation retry policy: capped exponential backoff plus a dead-letter
//! threshold.
//!
//! A failed operation is re-queued at the tail with a backoff gate, so it
//! cannot be retried busily and cannot starve the operations queued behind
//! it. Once `max_attempts` is reached the operation is dead-lettered and
//! never retried automatically.
//!
//! # Example
//!
//! ```
//! use planner_sync::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.delay_for(1), Duration::from_millis(500));
//! assert_eq!(policy.delay_for(2), Duration::from_secs(1));
//! assert!(!policy.is_exhausted(1));
//! ```

use std::time::Duration;

/// Backoff and give-up policy for failed sync operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Attempts after which the operation is dead-lettered.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
            max_attempts: 8,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next retry, given the number of failed attempts so
    /// far (1-based: the first failure yields the initial delay).
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(32);
        let factor = self.factor.powi(exponent as i32);
        // Clamp in float space: the uncapped product can exceed what a
        // Duration can hold long before the cap would apply.
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Whether the retry budget is spent.
    #[must_use]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}
