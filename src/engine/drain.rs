// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Queue draining: single-flight guard, FIFO dispatch, failure policy.
//!
//! One drain pass processes operations front to back. A transient remote
//! failure re-queues the failing operation at the tail with a backoff gate
//! and aborts the pass; operations behind it wait for the next trigger. A
//! head operation whose gate has not elapsed is rotated to the tail without
//! being dispatched, so a flaky record cannot starve the rest of the queue.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, error, warn};

use super::SyncEngine;
use crate::events::{CompletedKind, SyncEvent};
use crate::operation::SyncOperationKind;
use crate::record::SyncRecord;
use crate::storage::traits::{RemoteError, RemoteStore, StorageError};

/// Why an operation could not be committed remotely.
#[derive(Debug)]
pub(crate) enum DispatchError {
    /// Local read failed; the operation is dropped, not retried.
    Local(StorageError),
    /// Remote call failed; transient errors are retried.
    Remote(RemoteError),
}

#[derive(Debug, PartialEq, Eq)]
enum DrainOutcome {
    /// Queue drained to empty.
    Completed { processed: usize },
    /// A remote failure aborted the pass.
    Aborted { processed: usize },
    /// Nothing failed, but gated operations remain for a later pass.
    Deferred { processed: usize },
}

impl SyncEngine {
    /// Run one drain pass if connectivity allows and no pass is in flight.
    #[tracing::instrument(skip(self), fields(pending = self.queue.len()))]
    pub async fn try_drain(&self) {
        if !self.connectivity.can_sync() {
            debug!("skipping drain: offline or unauthenticated");
            return;
        }
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("drain already in flight");
            return;
        }

        let start = Instant::now();
        let outcome = self.drain_pass().await;
        self.draining.store(false, Ordering::Release);
        crate::metrics::set_queue_depth(self.queue.len());

        match outcome {
            DrainOutcome::Completed { processed } => {
                crate::metrics::record_drain("completed", start.elapsed());
                if processed > 0 {
                    debug!(processed, "drain pass emptied the queue");
                    self.send_event(SyncEvent::Completed { kind: CompletedKind::Drain });
                }
            }
            DrainOutcome::Aborted { processed } => {
                crate::metrics::record_drain("aborted", start.elapsed());
                debug!(processed, remaining = self.queue.len(), "drain pass aborted");
            }
            DrainOutcome::Deferred { processed } => {
                crate::metrics::record_drain("deferred", start.elapsed());
                debug!(processed, remaining = self.queue.len(), "operations still gated by backoff");
            }
        }
    }

    async fn drain_pass(&self) -> DrainOutcome {
        let mut processed = 0usize;
        // Bounded by the queue length at pass start so rotated operations
        // are not reconsidered within the same pass.
        let budget = self.queue.len();

        for _ in 0..budget {
            let Some(mut op) = self.queue.try_pop() else { break };

            if !op.is_eligible(Instant::now()) {
                debug!(op = op.kind.name(), attempts = op.attempts, "backoff gate armed; rotating to tail");
                self.queue.push(op);
                continue;
            }

            match self.dispatch(&op.kind).await {
                Ok(()) => {
                    processed += 1;
                    crate::metrics::record_operation(op.kind.name(), "success");
                    debug!(op = op.kind.name(), "operation committed remotely");
                }
                Err(DispatchError::Local(error)) => {
                    error!(op = op.kind.name(), %error, "local store failure; dropping operation");
                    crate::metrics::record_operation(op.kind.name(), "dropped");
                }
                Err(DispatchError::Remote(RemoteError::Unauthorized)) => {
                    warn!(op = op.kind.name(), "remote rejected credentials; suspending sync until re-auth");
                    self.connectivity.set_authenticated(false);
                    // Keep the operation; it runs once a fresh session exists.
                    self.queue.push(op);
                    self.send_event(SyncEvent::Failed { message: RemoteError::Unauthorized.to_string() });
                    return DrainOutcome::Aborted { processed };
                }
                Err(DispatchError::Remote(error)) => {
                    let kind = op.kind.name();
                    let delay = self.policy.delay_for(op.attempts + 1);
                    op.record_failure(delay);

                    if self.policy.is_exhausted(op.attempts) {
                        warn!(op = kind, attempts = op.attempts, %error, "retry budget exhausted; dead-lettering");
                        crate::metrics::record_operation(kind, "dead_letter");
                        self.push_dead_letter(op);
                    } else {
                        warn!(op = kind, attempts = op.attempts, %error, delay_ms = delay.as_millis() as u64, "remote failure; re-queued at tail");
                        crate::metrics::record_operation(kind, "retried");
                        crate::metrics::record_retry(kind);
                        self.queue.push(op);
                    }
                    self.send_event(SyncEvent::Failed { message: error.to_string() });
                    return DrainOutcome::Aborted { processed };
                }
            }
        }

        if self.queue.is_empty() {
            DrainOutcome::Completed { processed }
        } else {
            DrainOutcome::Deferred { processed }
        }
    }

    /// Translate one operation into remote CRUD calls.
    pub(crate) async fn dispatch(&self, kind: &SyncOperationKind) -> Result<(), DispatchError> {
        match kind {
            SyncOperationKind::UpsertPreferences(payload) => {
                // Push the freshest local copy; the payload is only a
                // fallback if the row vanished locally in the meantime.
                let record = self
                    .stores
                    .local_preferences
                    .get(&payload.key())
                    .await
                    .map_err(DispatchError::Local)?
                    .unwrap_or_else(|| payload.clone());
                self.push_record(self.stores.remote_preferences.as_ref(), &record)
                    .await
                    .map_err(DispatchError::Remote)
            }
            SyncOperationKind::UpsertSnapshot(payload) => {
                let record = self
                    .stores
                    .local_snapshots
                    .get(&payload.key())
                    .await
                    .map_err(DispatchError::Local)?
                    .unwrap_or_else(|| payload.clone());
                self.push_record(self.stores.remote_snapshots.as_ref(), &record)
                    .await
                    .map_err(DispatchError::Remote)
            }
            SyncOperationKind::UpsertFavorite(payload) => {
                // The payload carries this device's decorations (image,
                // note); pushing it overwrites the remote copy even when
                // the content hash is unchanged.
                self.push_record(self.stores.remote_favorites.as_ref(), payload)
                    .await
                    .map_err(DispatchError::Remote)
            }
            SyncOperationKind::DeleteFavorite(payload) => {
                let hash = payload.key();
                self.remote_call(self.stores.remote_favorites.delete(payload.user_id(), &hash))
                    .await
                    .map_err(DispatchError::Remote)
            }
            SyncOperationKind::FullDownload => {
                // Best-effort internally; never fails the queue operation.
                self.full_sync().await;
                Ok(())
            }
        }
    }

    /// Idempotent remote upsert: check by `(user, key)`, then insert or
    /// update.
    pub(crate) async fn push_record<R: SyncRecord>(
        &self,
        remote: &dyn RemoteStore<R>,
        record: &R,
    ) -> Result<(), RemoteError> {
        let user = record.user_id();
        let key = record.key();
        let existing = self.remote_call(remote.get(user, &key)).await?;
        if existing.is_some() {
            self.remote_call(remote.update(record)).await
        } else {
            self.remote_call(remote.insert(record)).await
        }
    }

    /// Bound a remote call with the configured timeout. Elapsing counts as
    /// a transient failure, identical to a network error.
    pub(crate) async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.config.remote_call_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }
}
