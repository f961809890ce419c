// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync engine orchestrator.
//!
//! The [`SyncEngine`] owns the pending-operation queue, a recurring drain
//! trigger, a connectivity-restored trigger, a single-flight guard, and the
//! one-shot full bidirectional sync. Local mutations call
//! [`enqueue`](SyncEngine::enqueue); everything else happens in the
//! background loop.
//!
//! ```text
//! local edit ──► enqueue ──► queue ──► drain pass ──► remote CRUD
//!                              ▲            │
//!                   re-queue + backoff ◄────┘ (transient failure)
//!
//! login ──► full_sync ──► pull prefs/snapshots/favorites, push favorites
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use planner_sync::{
//!     ConnectivityMonitor, InMemoryLocalStore, InMemoryRemoteStore, StaticAuth,
//!     SyncConfig, SyncEngine, SyncOperationKind, SyncStores, PreferencesRecord, UserId,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let stores = SyncStores {
//!     local_preferences: Arc::new(InMemoryLocalStore::new()),
//!     local_snapshots: Arc::new(InMemoryLocalStore::new()),
//!     local_favorites: Arc::new(InMemoryLocalStore::new()),
//!     remote_preferences: Arc::new(InMemoryRemoteStore::new()),
//!     remote_snapshots: Arc::new(InMemoryRemoteStore::new()),
//!     remote_favorites: Arc::new(InMemoryRemoteStore::new()),
//! };
//! let connectivity = Arc::new(ConnectivityMonitor::new());
//! let auth = Arc::new(StaticAuth(UserId::new("u-1")));
//! let engine = Arc::new(SyncEngine::new(SyncConfig::default(), connectivity.clone(), auth, stores));
//!
//! let _loop = engine.spawn();
//! connectivity.set_online(true);
//! connectivity.set_authenticated(true);
//!
//! engine.enqueue(SyncOperationKind::UpsertPreferences(
//!     PreferencesRecord::new(UserId::new("u-1")),
//! ));
//! # }
//! ```

mod drain;
mod full_sync;

pub use full_sync::FullSyncReport;

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::connectivity::{AuthContext, ConnectivityMonitor};
use crate::events::SyncEvent;
use crate::operation::{SyncOperation, SyncOperationKind};
use crate::queue::SyncOperationQueue;
use crate::record::{FavoriteRecord, PreferencesRecord, SnapshotRecord};
use crate::resilience::backoff::RetryPolicy;
use crate::storage::traits::{LocalStore, RemoteStore};

/// The six storage adapters the engine dispatches to: one local and one
/// remote per record kind.
pub struct SyncStores {
    pub local_preferences: Arc<dyn LocalStore<PreferencesRecord>>,
    pub local_snapshots: Arc<dyn LocalStore<SnapshotRecord>>,
    pub local_favorites: Arc<dyn LocalStore<FavoriteRecord>>,
    pub remote_preferences: Arc<dyn RemoteStore<PreferencesRecord>>,
    pub remote_snapshots: Arc<dyn RemoteStore<SnapshotRecord>>,
    pub remote_favorites: Arc<dyn RemoteStore<FavoriteRecord>>,
}

/// The offline-first sync orchestrator. One instance per authenticated
/// session; `Send + Sync`, designed to live in an `Arc`.
pub struct SyncEngine {
    pub(crate) config: SyncConfig,
    pub(crate) policy: RetryPolicy,
    pub(crate) queue: SyncOperationQueue,
    /// Single-flight guard: at most one drain pass at a time.
    pub(crate) draining: AtomicBool,
    /// Poked by `enqueue` when syncing is currently possible.
    pub(crate) wake: Notify,
    pub(crate) events: broadcast::Sender<SyncEvent>,
    pub(crate) connectivity: Arc<ConnectivityMonitor>,
    pub(crate) auth: Arc<dyn AuthContext>,
    pub(crate) stores: SyncStores,
    pub(crate) dead_letters: Mutex<VecDeque<SyncOperation>>,
    shutdown: watch::Sender<bool>,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        connectivity: Arc<ConnectivityMonitor>,
        auth: Arc<dyn AuthContext>,
        stores: SyncStores,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let policy = config.retry_policy();
        Self {
            config,
            policy,
            queue: SyncOperationQueue::new(),
            draining: AtomicBool::new(false),
            wake: Notify::new(),
            events,
            connectivity,
            auth,
            stores,
            dead_letters: Mutex::new(VecDeque::new()),
            shutdown,
        }
    }

    /// Queue a mutation for remote propagation. Fire-and-forget: never
    /// blocks, never fails. The local write must already be durable before
    /// this is called.
    #[tracing::instrument(skip_all, fields(op = kind.name()))]
    pub fn enqueue(&self, kind: SyncOperationKind) {
        self.queue.push(SyncOperation::new(kind));
        crate::metrics::set_queue_depth(self.queue.len());
        if self.connectivity.can_sync() {
            self.wake.notify_one();
        } else {
            debug!("cannot sync now; operation parked in queue");
        }
    }

    /// Observability hook: operations waiting in the queue.
    #[must_use]
    pub fn pending_operations_count(&self) -> usize {
        self.queue.len()
    }

    /// Operations that exhausted their retry budget.
    #[must_use]
    pub fn dead_letter_count(&self) -> usize {
        self.dead_letters.lock().len()
    }

    /// Take the dead-lettered operations, leaving the buffer empty. The
    /// caller decides whether to re-enqueue, surface, or discard them.
    pub fn drain_dead_letters(&self) -> Vec<SyncOperation> {
        let drained: Vec<_> = self.dead_letters.lock().drain(..).collect();
        crate::metrics::set_dead_letters(0);
        drained
    }

    /// Subscribe to completion/failure events. Dependents re-read local
    /// state on every [`SyncEvent::Completed`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// Spawn the background loop driving drains from the periodic timer,
    /// connectivity-restored transitions, and enqueue wakeups.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run().await })
    }

    /// Stop the background loop. In-flight drain passes finish their
    /// current operation; the queue itself is not persisted.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.drain_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut conn_rx = self.connectivity.subscribe();
        let mut could_sync = conn_rx.borrow().can_sync();
        let mut shutdown_rx = self.shutdown.subscribe();
        info!("sync engine loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.queue.is_empty() {
                        self.try_drain().await;
                    }
                }
                changed = conn_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let can_sync_now = conn_rx.borrow_and_update().can_sync();
                    // Only the offline→online transition triggers a drain;
                    // every other change is just recorded.
                    if can_sync_now && !could_sync {
                        info!("connectivity restored; draining queue");
                        self.try_drain().await;
                    }
                    could_sync = can_sync_now;
                }
                _ = self.wake.notified() => {
                    self.try_drain().await;
                }
                _ = shutdown_rx.changed() => {
                    info!("sync engine loop stopping");
                    break;
                }
            }
        }
    }

    pub(crate) fn send_event(&self, event: SyncEvent) {
        // A send error just means nobody is subscribed right now.
        let _ = self.events.send(event);
    }

    pub(crate) fn push_dead_letter(&self, op: SyncOperation) {
        let mut letters = self.dead_letters.lock();
        letters.push_back(op);
        while letters.len() > self.config.dead_letter_capacity {
            letters.pop_front();
        }
        crate::metrics::set_dead_letters(letters.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::StaticAuth;
    use crate::record::UserId;
    use crate::storage::{InMemoryLocalStore, InMemoryRemoteStore};

    pub(crate) struct TestHarness {
        pub engine: Arc<SyncEngine>,
        pub connectivity: Arc<ConnectivityMonitor>,
        pub remote_preferences: Arc<InMemoryRemoteStore<PreferencesRecord>>,
    }

    pub(crate) fn harness() -> TestHarness {
        let remote_preferences = Arc::new(InMemoryRemoteStore::new());
        let stores = SyncStores {
            local_preferences: Arc::new(InMemoryLocalStore::new()),
            local_snapshots: Arc::new(InMemoryLocalStore::new()),
            local_favorites: Arc::new(InMemoryLocalStore::new()),
            remote_preferences: remote_preferences.clone(),
            remote_snapshots: Arc::new(InMemoryRemoteStore::new()),
            remote_favorites: Arc::new(InMemoryRemoteStore::new()),
        };
        let connectivity = Arc::new(ConnectivityMonitor::new());
        let auth = Arc::new(StaticAuth(UserId::new("u-1")));
        let engine = Arc::new(SyncEngine::new(SyncConfig::default(), connectivity.clone(), auth, stores));
        TestHarness { engine, connectivity, remote_preferences }
    }

    #[test]
    fn test_enqueue_while_offline_parks_operation() {
        let h = harness();
        h.engine
            .enqueue(SyncOperationKind::UpsertPreferences(PreferencesRecord::new(UserId::new("u-1"))));

        assert_eq!(h.engine.pending_operations_count(), 1);
        assert_eq!(h.remote_preferences.calls(), 0); // no remote traffic
    }

    #[tokio::test]
    async fn test_try_drain_gated_by_connectivity() {
        let h = harness();
        h.engine
            .enqueue(SyncOperationKind::UpsertPreferences(PreferencesRecord::new(UserId::new("u-1"))));

        h.engine.try_drain().await;
        assert_eq!(h.engine.pending_operations_count(), 1);
        assert_eq!(h.remote_preferences.calls(), 0);

        h.connectivity.set_online(true);
        h.connectivity.set_authenticated(true);
        h.engine.try_drain().await;
        assert_eq!(h.engine.pending_operations_count(), 0);
        assert!(h.remote_preferences.calls() > 0);
    }

    #[test]
    fn test_dead_letter_buffer_is_bounded() {
        let h = harness();
        let capacity = h.engine.config.dead_letter_capacity;
        for _ in 0..capacity + 10 {
            h.engine.push_dead_letter(SyncOperation::new(SyncOperationKind::FullDownload));
        }
        assert_eq!(h.engine.dead_letter_count(), capacity);

        let drained = h.engine.drain_dead_letters();
        assert_eq!(drained.len(), capacity);
        assert_eq!(h.engine.dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_background_loop_drains_on_connectivity_restore() {
        let h = harness();
        h.engine
            .enqueue(SyncOperationKind::UpsertPreferences(PreferencesRecord::new(UserId::new("u-1"))));
        let handle = h.engine.spawn();

        h.connectivity.set_online(true);
        h.connectivity.set_authenticated(true);

        // The loop reacts to the watch transition.
        for _ in 0..50 {
            if h.engine.pending_operations_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.engine.pending_operations_count(), 0);

        h.engine.shutdown();
        let _ = handle.await;
    }
}
