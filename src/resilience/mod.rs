//! Failure-handling policy for queued operations.

pub mod backoff;
