//! Sync operations: the unit of work produced by local mutations.
//!
//! Every local edit that also wants remote persistence enqueues one
//! [`SyncOperation`]. Operations are consumed and discarded on success,
//! re-queued at the tail with a backoff gate on transient failure, and moved
//! to the dead-letter buffer once the retry budget is exhausted. The queue is
//! not persisted across restarts.

use std::time::Instant;

use crate::record::{epoch_millis, FavoriteRecord, PreferencesRecord, SnapshotRecord};

/// What a queued operation should do against the remote store.
#[derive(Debug, Clone)]
pub enum SyncOperationKind {
    /// Push the user's preferences row (insert or update by user id).
    UpsertPreferences(PreferencesRecord),
    /// Push one daily snapshot (insert or update by `(user, date)`).
    UpsertSnapshot(SnapshotRecord),
    /// Push one favorite (insert or update by `(user, content hash)`).
    /// Re-upserting an unchanged composition still overwrites the remote
    /// copy, which is how image/note decorations propagate.
    UpsertFavorite(FavoriteRecord),
    /// Delete the remote favorite with this record's content hash.
    DeleteFavorite(FavoriteRecord),
    /// Run the one-shot bidirectional reconciliation.
    FullDownload,
}

impl SyncOperationKind {
    /// Short label for logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpsertPreferences(_) => "upsert_preferences",
            Self::UpsertSnapshot(_) => "upsert_snapshot",
            Self::UpsertFavorite(_) => "upsert_favorite",
            Self::DeleteFavorite(_) => "delete_favorite",
            Self::FullDownload => "full_download",
        }
    }
}

/// A pending mutation plus its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct SyncOperation {
    pub kind: SyncOperationKind,
    /// When the operation was enqueued (epoch millis).
    pub enqueued_at: i64,
    /// Failed dispatch attempts so far.
    pub attempts: u32,
    /// Backoff gate: the operation is not eligible before this instant.
    pub not_before: Option<Instant>,
}

impl SyncOperation {
    pub fn new(kind: SyncOperationKind) -> Self {
        Self {
            kind,
            enqueued_at: epoch_millis(),
            attempts: 0,
            not_before: None,
        }
    }

    /// Whether the drain loop may dispatch this operation now.
    #[must_use]
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.not_before.map_or(true, |gate| now >= gate)
    }

    /// Record a failed dispatch and arm the backoff gate.
    pub(crate) fn record_failure(&mut self, delay: std::time::Duration) {
        self.attempts += 1;
        self.not_before = Some(Instant::now() + delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UserId;
    use std::time::Duration;

    #[test]
    fn test_new_operation_is_eligible() {
        let op = SyncOperation::new(SyncOperationKind::FullDownload);
        assert_eq!(op.attempts, 0);
        assert!(op.enqueued_at > 0);
        assert!(op.is_eligible(Instant::now()));
    }

    #[test]
    fn test_record_failure_arms_gate() {
        let mut op = SyncOperation::new(SyncOperationKind::UpsertPreferences(PreferencesRecord::new(
            UserId::new("u-1"),
        )));
        op.record_failure(Duration::from_secs(60));
        assert_eq!(op.attempts, 1);
        assert!(!op.is_eligible(Instant::now()));
        assert!(op.is_eligible(Instant::now() + Duration::from_secs(61)));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SyncOperationKind::FullDownload.name(), "full_download");
        let prefs = SyncOperationKind::UpsertPreferences(PreferencesRecord::new(UserId::new("u")));
        assert_eq!(prefs.name(), "upsert_preferences");
    }
}
