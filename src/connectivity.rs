// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Connectivity and authentication state.
//!
//! The engine may only talk to the remote store when the device is online
//! *and* the user is authenticated. [`ConnectivityMonitor`] tracks both bits
//! and broadcasts transitions over a watch channel; the engine treats the
//! false-to-true transition of `can_sync()` as a drain trigger.
//!
//! Reachability is detected by polling a [`ReachabilityProbe`] on a fixed
//! interval. Platforms with push-style network notifications can skip the
//! polling task and call [`set_online`](ConnectivityMonitor::set_online)
//! directly; the engine's contract does not change.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::record::UserId;

/// Snapshot of the two bits that gate syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectivityState {
    pub is_online: bool,
    pub is_authenticated: bool,
}

impl ConnectivityState {
    #[must_use]
    pub fn can_sync(&self) -> bool {
        self.is_online && self.is_authenticated
    }
}

/// Network reachability check. Implementations typically issue a cheap
/// request against the remote store's health endpoint.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Narrow view of the auth subsystem: who is signed in right now.
pub trait AuthContext: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Fixed-user [`AuthContext`] for tests and single-user embedding.
pub struct StaticAuth(pub UserId);

impl AuthContext for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.0.clone())
    }
}

/// Tracks online/authenticated state and broadcasts transitions.
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    state_rx: watch::Receiver<ConnectivityState>,
}

impl ConnectivityMonitor {
    /// Starts offline and unauthenticated.
    #[must_use]
    pub fn new() -> Self {
        let (state, state_rx) = watch::channel(ConnectivityState::default());
        Self { state, state_rx }
    }

    #[must_use]
    pub fn state(&self) -> ConnectivityState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn can_sync(&self) -> bool {
        self.state().can_sync()
    }

    /// Watch for state transitions. Only actual changes are published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state_rx.clone()
    }

    /// Report network reachability (from the polling task or an OS push).
    pub fn set_online(&self, is_online: bool) {
        self.update(|s| s.is_online = is_online);
    }

    /// Report authentication state (from the auth subsystem, or from the
    /// engine when the remote rejects credentials).
    pub fn set_authenticated(&self, is_authenticated: bool) {
        self.update(|s| s.is_authenticated = is_authenticated);
    }

    fn update(&self, apply: impl FnOnce(&mut ConnectivityState)) {
        let changed = self.state.send_if_modified(|current| {
            let before = *current;
            apply(current);
            *current != before
        });
        if changed {
            let state = self.state();
            info!(
                online = state.is_online,
                authenticated = state.is_authenticated,
                can_sync = state.can_sync(),
                "connectivity changed"
            );
            crate::metrics::set_connectivity(state.is_online, state.is_authenticated);
        }
    }

    /// Spawn the reachability polling task.
    ///
    /// Polls `probe` every `interval` and feeds the result into
    /// [`set_online`](Self::set_online). The task runs until the monitor is
    /// dropped by every other holder; abort the handle to stop it earlier.
    pub fn spawn_polling(self: &Arc<Self>, probe: Arc<dyn ReachabilityProbe>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let reachable = probe.is_reachable().await;
                debug!(reachable, "reachability poll");
                monitor.set_online(reachable);
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
