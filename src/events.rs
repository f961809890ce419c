//! Events the engine publishes to dependents.
//!
//! Cached UI projections subscribe and re-read local state whenever a
//! [`SyncEvent::Completed`] arrives. Failures surface here as a status
//! string only; sync never raises a blocking error to the user.

use std::fmt;

/// Which engine path finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletedKind {
    /// A drain pass emptied the queue.
    Drain,
    /// The one-shot bidirectional full sync ran.
    FullSync,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Dependents must re-read local state on receipt.
    Completed { kind: CompletedKind },
    /// Optional display only ("sync failed: ...").
    Failed { message: String },
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { kind: CompletedKind::Drain } => write!(f, "sync completed (drain)"),
            Self::Completed { kind: CompletedKind::FullSync } => write!(f, "sync completed (full sync)"),
            Self::Failed { message } => write!(f, "sync failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let done = SyncEvent::Completed { kind: CompletedKind::Drain };
        assert_eq!(done.to_string(), "sync completed (drain)");

        let failed = SyncEvent::Failed { message: "network error: offline".to_string() };
        assert_eq!(failed.to_string(), "sync failed: network error: offline");
    }
}
