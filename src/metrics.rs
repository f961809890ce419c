// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for planner-sync.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The embedding
//! app chooses the exporter.
//!
//! # Metric Naming Convention
//! - `planner_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `kind`: upsert_preferences, upsert_snapshot, upsert_favorite,
//!   delete_favorite, full_download
//! - `status`: success, retried, dead_letter, dropped
//! - `step`: preferences, snapshots, favorites_pull, favorites_push

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

/// Record the outcome of one dispatched operation.
pub fn record_operation(kind: &str, status: &str) {
    counter!(
        "planner_sync_operations_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a finished drain pass.
pub fn record_drain(outcome: &str, duration: Duration) {
    counter!(
        "planner_sync_drain_passes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("planner_sync_drain_seconds").record(duration.as_secs_f64());
}

/// Record one step of the full bidirectional sync.
pub fn record_full_sync_step(step: &str, status: &str) {
    counter!(
        "planner_sync_full_sync_steps_total",
        "step" => step.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an operation scheduled for retry.
pub fn record_retry(kind: &str) {
    counter!(
        "planner_sync_retries_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Set the current pending-operation count.
pub fn set_queue_depth(depth: usize) {
    gauge!("planner_sync_queue_depth").set(depth as f64);
}

/// Set the current dead-letter buffer size.
pub fn set_dead_letters(count: usize) {
    gauge!("planner_sync_dead_letters").set(count as f64);
}

/// Set the connectivity gauges (1 = yes, 0 = no).
pub fn set_connectivity(online: bool, authenticated: bool) {
    gauge!("planner_sync_online").set(u8::from(online) as f64);
    gauge!("planner_sync_authenticated").set(u8::from(authenticated) as f64);
}

/// RAII timer that records a latency histogram when dropped.
pub struct LatencyTimer {
    name: &'static str,
    start: Instant,
}

impl LatencyTimer {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.name).record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder these are no-ops; the tests just pin the
    // call signatures.
    #[test]
    fn test_metric_helpers_are_callable() {
        record_operation("upsert_favorite", "success");
        record_drain("completed", Duration::from_millis(12));
        record_full_sync_step("favorites_pull", "success");
        record_retry("upsert_snapshot");
        set_queue_depth(3);
        set_dead_letters(0);
        set_connectivity(true, false);
    }

    #[test]
    fn test_latency_timer_drops_cleanly() {
        let timer = LatencyTimer::new("planner_sync_test_seconds");
        drop(timer);
    }
}
