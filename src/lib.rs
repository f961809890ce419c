//! # Planner Sync
//!
//! Offline-first sync engine for a personal daily meal planner. The app
//! keeps a local, always-available copy of the user's records (preferences,
//! daily snapshots, favorited meals) and this crate opportunistically
//! reconciles that copy with the remote authoritative store whenever
//! connectivity and authentication allow.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      Local mutations                      │
//! │  • UI-facing services write the local store, then call    │
//! │    enqueue(), fire-and-forget                             │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                   SyncOperationQueue                      │
//! │  • Unbounded FIFO, concurrent producers, one consumer     │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!            (timer tick / connectivity restored / wakeup)
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                   SyncEngine drain pass                   │
//! │  • Single-flight, strictly sequential FIFO dispatch       │
//! │  • Transient failure: re-queue at tail + backoff, abort   │
//! │  • Retry budget spent: dead-letter                        │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │              RemoteStore (authoritative)                  │
//! │  • preferences by user, snapshots by (user, date),        │
//! │    favorites by (user, content hash)                      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! At login a separate one-shot [`full_sync`](SyncEngine::full_sync) pulls
//! everything down and pushes local-only favorites up, merging by identity.
//!
//! ## Cross-device favorite identity
//!
//! Favorites are keyed by a SHA-256 over a normalized projection of the
//! composition: the calendar date forced to a sentinel, images and notes
//! stripped. Two devices that independently favorite the same meal
//! converge on the same identity without ever exchanging keys. See
//! [`identity`].
//!
//! ## Guarantees (and non-guarantees)
//!
//! - A local edit is durable locally before it is enqueued; sync failure
//!   only delays remote visibility.
//! - Upserts are idempotent; re-running a sync never creates duplicates.
//! - Within one drain pass, operations commit in FIFO order. Across passes
//!   a retried operation may be overtaken by later ones.
//! - Conflict policy is last-writer-wins; there is no multi-writer merge.
//! - The queue is not persisted across restarts.

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod events;
pub mod identity;
pub mod metrics;
pub mod operation;
pub mod queue;
pub mod record;
pub mod resilience;
pub mod storage;

pub use config::SyncConfig;
pub use connectivity::{AuthContext, ConnectivityMonitor, ConnectivityState, ReachabilityProbe, StaticAuth};
pub use engine::{FullSyncReport, SyncEngine, SyncStores};
pub use events::{CompletedKind, SyncEvent};
pub use identity::{content_hash, ContentHash};
pub use metrics::LatencyTimer;
pub use operation::{SyncOperation, SyncOperationKind};
pub use queue::SyncOperationQueue;
pub use record::{
    CalendarDate, FavoriteRecord, MealComponent, PreferencesRecord, SnapshotRecord, SyncRecord, UserId,
};
pub use resilience::backoff::RetryPolicy;
pub use storage::{InMemoryLocalStore, InMemoryRemoteStore, LocalStore, RemoteError, RemoteStore, StorageError};
