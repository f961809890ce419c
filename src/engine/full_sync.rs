// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One-shot full bidirectional reconciliation, run at login and on an
//! explicit "sync now".
//!
//! Unlike queue draining, every step here is independently best-effort: a
//! failing step is logged and the remaining steps still run. Reconciliation
//! is by identity (set symmetric difference), never a field-level merge:
//! each key is either pulled or pushed in one pass, not diffed.
//!
//! This is the only path where the engine writes into the local store.

use std::collections::HashSet;

use tracing::{error, info, warn};

use super::SyncEngine;
use crate::events::{CompletedKind, SyncEvent};
use crate::identity::ContentHash;
use crate::record::SyncRecord;
use crate::storage::traits::RemoteError;

/// What one full sync accomplished. Partial failure shows up in
/// `failed_steps` rather than aborting the pass.
#[derive(Debug, Default)]
pub struct FullSyncReport {
    pub preferences_pulled: usize,
    pub snapshots_pulled: usize,
    pub favorites_pulled: usize,
    pub favorites_pushed: usize,
    pub failed_steps: Vec<&'static str>,
}

impl FullSyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

impl SyncEngine {
    /// Run the full bidirectional sync:
    ///
    /// 1. pull remote preferences, overwrite local
    /// 2. pull remote snapshots, upsert each by date
    /// 3. pull remote favorites, insert those whose hash is unknown locally
    /// 4. push local favorites absent remotely
    #[tracing::instrument(skip(self))]
    pub async fn full_sync(&self) -> FullSyncReport {
        let mut report = FullSyncReport::default();
        let Some(user) = self.auth.current_user_id() else {
            warn!("full sync requested with no signed-in user");
            report.failed_steps.push("auth");
            return report;
        };
        info!(user = %user, "starting full bidirectional sync");

        // Step 1: preferences. Remote is authoritative at login.
        match self.remote_call(self.stores.remote_preferences.fetch_all(&user)).await {
            Ok(records) => {
                for record in &records {
                    if let Err(error) = self.stores.local_preferences.upsert(record).await {
                        error!(%error, "failed to store pulled preferences");
                    }
                }
                report.preferences_pulled = records.len();
                crate::metrics::record_full_sync_step("preferences", "success");
            }
            Err(error) => self.note_step_failure(&mut report, "preferences", &error),
        }

        // Step 2: snapshots, upserted in place by date key.
        match self.remote_call(self.stores.remote_snapshots.fetch_all(&user)).await {
            Ok(records) => {
                for record in &records {
                    if let Err(error) = self.stores.local_snapshots.upsert(record).await {
                        error!(date = %record.date, %error, "failed to store pulled snapshot");
                    }
                }
                report.snapshots_pulled = records.len();
                crate::metrics::record_full_sync_step("snapshots", "success");
            }
            Err(error) => self.note_step_failure(&mut report, "snapshots", &error),
        }

        // Steps 3 and 4 share one remote listing; if the fetch itself fails
        // both favorite steps fail.
        match self.remote_call(self.stores.remote_favorites.fetch_all(&user)).await {
            Ok(remote_favorites) => {
                let remote_hashes: HashSet<ContentHash> = remote_favorites.iter().map(SyncRecord::key).collect();

                match self.stores.local_favorites.list_all().await {
                    Ok(local_favorites) => {
                        let local_hashes: HashSet<ContentHash> = local_favorites.iter().map(SyncRecord::key).collect();

                        // Step 3: pull favorites unknown on this device.
                        // Favorites already present locally are left alone;
                        // the local copy may carry decorations the remote
                        // lacks.
                        for record in &remote_favorites {
                            if !local_hashes.contains(&record.key()) {
                                match self.stores.local_favorites.upsert(record).await {
                                    Ok(()) => report.favorites_pulled += 1,
                                    Err(error) => error!(%error, "failed to store pulled favorite"),
                                }
                            }
                        }
                        crate::metrics::record_full_sync_step("favorites_pull", "success");

                        // Step 4: push favorites the remote has never seen.
                        let mut push_failed = false;
                        for record in &local_favorites {
                            if !remote_hashes.contains(&record.key()) {
                                match self.remote_call(self.stores.remote_favorites.insert(record)).await {
                                    Ok(()) => report.favorites_pushed += 1,
                                    Err(error) => {
                                        warn!(name = %record.name, %error, "failed to push local favorite");
                                        push_failed = true;
                                        if matches!(error, RemoteError::Unauthorized) {
                                            self.connectivity.set_authenticated(false);
                                            break;
                                        }
                                    }
                                }
                            }
                        }
                        if push_failed {
                            report.failed_steps.push("favorites_push");
                            crate::metrics::record_full_sync_step("favorites_push", "failure");
                        } else {
                            crate::metrics::record_full_sync_step("favorites_push", "success");
                        }
                    }
                    Err(error) => {
                        error!(%error, "failed to list local favorites");
                        report.failed_steps.push("favorites_pull");
                        report.failed_steps.push("favorites_push");
                        crate::metrics::record_full_sync_step("favorites_pull", "failure");
                    }
                }
            }
            Err(error) => {
                self.note_step_failure(&mut report, "favorites_pull", &error);
                report.failed_steps.push("favorites_push");
            }
        }

        if !report.is_clean() {
            self.send_event(SyncEvent::Failed {
                message: format!("full sync steps failed: {}", report.failed_steps.join(", ")),
            });
        }
        // Fired even on partial failure: any completed pull already changed
        // local state, and dependents must re-read it.
        self.send_event(SyncEvent::Completed { kind: CompletedKind::FullSync });

        info!(
            preferences = report.preferences_pulled,
            snapshots = report.snapshots_pulled,
            favorites_pulled = report.favorites_pulled,
            favorites_pushed = report.favorites_pushed,
            failed_steps = report.failed_steps.len(),
            "full sync finished"
        );
        report
    }

    fn note_step_failure(&self, report: &mut FullSyncReport, step: &'static str, error: &RemoteError) {
        warn!(step, %error, "full sync step failed");
        crate::metrics::record_full_sync_step(step, "failure");
        report.failed_steps.push(step);
        if matches!(error, RemoteError::Unauthorized) {
            self.connectivity.set_authenticated(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::SyncConfig;
    use crate::connectivity::{ConnectivityMonitor, StaticAuth};
    use crate::engine::{SyncEngine, SyncStores};
    use crate::record::{CalendarDate, FavoriteRecord, MealComponent, PreferencesRecord, SnapshotRecord, UserId};
    use crate::storage::{InMemoryLocalStore, InMemoryRemoteStore, LocalStore};

    struct Harness {
        engine: Arc<SyncEngine>,
        local_preferences: Arc<InMemoryLocalStore<PreferencesRecord>>,
        local_snapshots: Arc<InMemoryLocalStore<SnapshotRecord>>,
        local_favorites: Arc<InMemoryLocalStore<FavoriteRecord>>,
        remote_preferences: Arc<InMemoryRemoteStore<PreferencesRecord>>,
        remote_snapshots: Arc<InMemoryRemoteStore<SnapshotRecord>>,
        remote_favorites: Arc<InMemoryRemoteStore<FavoriteRecord>>,
    }

    fn harness() -> Harness {
        let local_preferences = Arc::new(InMemoryLocalStore::new());
        let local_snapshots = Arc::new(InMemoryLocalStore::new());
        let local_favorites = Arc::new(InMemoryLocalStore::new());
        let remote_preferences = Arc::new(InMemoryRemoteStore::new());
        let remote_snapshots = Arc::new(InMemoryRemoteStore::new());
        let remote_favorites = Arc::new(InMemoryRemoteStore::new());
        let stores = SyncStores {
            local_preferences: local_preferences.clone(),
            local_snapshots: local_snapshots.clone(),
            local_favorites: local_favorites.clone(),
            remote_preferences: remote_preferences.clone(),
            remote_snapshots: remote_snapshots.clone(),
            remote_favorites: remote_favorites.clone(),
        };
        let connectivity = Arc::new(ConnectivityMonitor::new());
        connectivity.set_online(true);
        connectivity.set_authenticated(true);
        let auth = Arc::new(StaticAuth(UserId::new("u-1")));
        let engine = Arc::new(SyncEngine::new(SyncConfig::default(), connectivity, auth, stores));
        Harness {
            engine,
            local_preferences,
            local_snapshots,
            local_favorites,
            remote_preferences,
            remote_snapshots,
            remote_favorites,
        }
    }

    fn favorite(name: &str, grams: f64) -> FavoriteRecord {
        FavoriteRecord::new(
            UserId::new("u-1"),
            CalendarDate::new("2024-06-01"),
            name,
            vec![MealComponent {
                food_name: name.to_string(),
                grams,
                kcal: grams * 1.5,
                protein_g: grams * 0.2,
                carbs_g: grams * 0.3,
                fat_g: grams * 0.1,
            }],
        )
    }

    #[tokio::test]
    async fn test_pull_overwrites_local_preferences() {
        let h = harness();
        let user = UserId::new("u-1");

        let mut stale = PreferencesRecord::new(user.clone());
        stale.daily_kcal_target = 1500.0;
        h.local_preferences.upsert(&stale).await.unwrap();

        let mut remote = PreferencesRecord::new(user.clone());
        remote.daily_kcal_target = 2100.0;
        h.remote_preferences.seed(remote);

        let report = h.engine.full_sync().await;

        assert!(report.is_clean());
        assert_eq!(report.preferences_pulled, 1);
        let local = h.local_preferences.get(&user).await.unwrap().unwrap();
        assert_eq!(local.daily_kcal_target, 2100.0);
    }

    #[tokio::test]
    async fn test_snapshots_upserted_by_date() {
        let h = harness();
        let user = UserId::new("u-1");

        h.local_snapshots
            .upsert(&SnapshotRecord::new(user.clone(), CalendarDate::new("2024-01-01"), "{}".into(), "old".into()))
            .await
            .unwrap();
        h.remote_snapshots
            .seed(SnapshotRecord::new(user.clone(), CalendarDate::new("2024-01-01"), "{}".into(), "new".into()));
        h.remote_snapshots
            .seed(SnapshotRecord::new(user, CalendarDate::new("2024-01-02"), "{}".into(), "p2".into()));

        let report = h.engine.full_sync().await;

        assert_eq!(report.snapshots_pulled, 2);
        assert_eq!(h.local_snapshots.len(), 2);
        let day1 = h.local_snapshots.get(&CalendarDate::new("2024-01-01")).await.unwrap().unwrap();
        assert_eq!(day1.plan_json, "new");
    }

    #[tokio::test]
    async fn test_favorite_sets_converge_both_directions() {
        let h = harness();

        // Shared favorite exists on both sides; one is local-only, one
        // remote-only.
        let shared = favorite("shared oats", 80.0);
        let local_only = favorite("local salad", 120.0);
        let remote_only = favorite("remote stew", 300.0);

        h.local_favorites.upsert(&shared).await.unwrap();
        h.local_favorites.upsert(&local_only).await.unwrap();
        h.remote_favorites.seed(shared);
        h.remote_favorites.seed(remote_only);

        let report = h.engine.full_sync().await;

        assert!(report.is_clean());
        assert_eq!(report.favorites_pulled, 1);
        assert_eq!(report.favorites_pushed, 1);
        // Both sides now hold the union of the two sets.
        assert_eq!(h.local_favorites.len(), 3);
        assert_eq!(h.remote_favorites.len(), 3);
    }

    #[tokio::test]
    async fn test_pull_skips_favorites_already_known_locally() {
        let h = harness();

        // Same composition on both sides, but the local copy is decorated.
        let mut decorated = favorite("oats", 80.0);
        decorated.note = Some("with cinnamon".to_string());
        let plain = favorite("oats", 80.0);

        h.local_favorites.upsert(&decorated).await.unwrap();
        h.remote_favorites.seed(plain);

        let report = h.engine.full_sync().await;

        assert_eq!(report.favorites_pulled, 0);
        assert_eq!(h.local_favorites.len(), 1);
        let kept = h.local_favorites.list_all().await.unwrap();
        assert_eq!(kept[0].note.as_deref(), Some("with cinnamon"));
    }

    #[tokio::test]
    async fn test_step_failure_does_not_abort_remaining_steps() {
        let h = harness();
        let user = UserId::new("u-1");

        h.remote_preferences.set_unauthorized(false);
        h.remote_snapshots.seed(SnapshotRecord::new(user, CalendarDate::new("2024-01-02"), "{}".into(), "p2".into()));
        h.local_favorites.upsert(&favorite("salad", 120.0)).await.unwrap();

        // Preferences step fails; snapshots and favorites still run.
        h.remote_preferences.fail_next(1);
        let report = h.engine.full_sync().await;

        assert_eq!(report.failed_steps, vec!["preferences"]);
        assert_eq!(report.snapshots_pulled, 1);
        assert_eq!(report.favorites_pushed, 1);
    }

    #[tokio::test]
    async fn test_full_sync_without_user_reports_auth() {
        let h = harness();
        struct NoAuth;
        impl crate::connectivity::AuthContext for NoAuth {
            fn current_user_id(&self) -> Option<UserId> {
                None
            }
        }
        let engine = SyncEngine::new(
            SyncConfig::default(),
            h.engine.connectivity().clone(),
            Arc::new(NoAuth),
            SyncStores {
                local_preferences: Arc::new(InMemoryLocalStore::new()),
                local_snapshots: Arc::new(InMemoryLocalStore::new()),
                local_favorites: Arc::new(InMemoryLocalStore::new()),
                remote_preferences: Arc::new(InMemoryRemoteStore::new()),
                remote_snapshots: Arc::new(InMemoryRemoteStore::new()),
                remote_favorites: Arc::new(InMemoryRemoteStore::new()),
            },
        );

        let report = engine.full_sync().await;
        assert_eq!(report.failed_steps, vec!["auth"]);
    }
}
