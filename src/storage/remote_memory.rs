//! In-memory stand-in for the remote authoritative store, with scriptable
//! fault injection for failure-path tests.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{RemoteError, RemoteStore};
use crate::record::{SyncRecord, UserId};

/// Remote collection for one record kind, keyed by `(user, key)`.
///
/// Every trait call passes through a fault gate first, so a scripted failure
/// hits whichever remote call the engine issues next (including the
/// existence check before an insert-or-update).
pub struct InMemoryRemoteStore<R: SyncRecord> {
    data: DashMap<(UserId, R::Key), R>,
    fail_next: AtomicU32,
    fail_at: AtomicU64,
    unauthorized: AtomicBool,
    calls: AtomicU64,
}

impl<R: SyncRecord> InMemoryRemoteStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            fail_next: AtomicU32::new(0),
            fail_at: AtomicU64::new(0),
            unauthorized: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// Fail the next `n` remote calls with a network error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Let the next `nth - 1` calls through, then fail the `nth` one with a
    /// network error. One-shot.
    pub fn fail_next_at(&self, nth: u64) {
        self.fail_at.store(self.calls.load(Ordering::SeqCst) + nth, Ordering::SeqCst);
    }

    /// Reject every call with `Unauthorized` until cleared.
    pub fn set_unauthorized(&self, rejected: bool) {
        self.unauthorized.store(rejected, Ordering::SeqCst);
    }

    /// Total remote calls observed (including failed ones).
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Direct read for assertions, bypassing the fault gate.
    #[must_use]
    pub fn peek(&self, user: &UserId, key: &R::Key) -> Option<R> {
        self.data
            .get(&(user.clone(), key.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Seed a record directly, bypassing the fault gate.
    pub fn seed(&self, record: R) {
        self.data.insert((record.user_id().clone(), record.key()), record);
    }

    fn gate(&self) -> Result<(), RemoteError> {
        let call_no = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }
        if self
            .fail_at
            .compare_exchange(call_no, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return Err(RemoteError::Network("injected failure".to_string()));
        }
        let failed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(RemoteError::Network("injected failure".to_string()));
        }
        Ok(())
    }
}

impl<R: SyncRecord> Default for InMemoryRemoteStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: SyncRecord> RemoteStore<R> for InMemoryRemoteStore<R> {
    async fn fetch_all(&self, user: &UserId) -> Result<Vec<R>, RemoteError> {
        self.gate()?;
        Ok(self
            .data
            .iter()
            .filter(|entry| &entry.key().0 == user)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, user: &UserId, key: &R::Key) -> Result<Option<R>, RemoteError> {
        self.gate()?;
        Ok(self
            .data
            .get(&(user.clone(), key.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: &R) -> Result<(), RemoteError> {
        self.gate()?;
        self.data
            .insert((record.user_id().clone(), record.key()), record.clone());
        Ok(())
    }

    async fn update(&self, record: &R) -> Result<(), RemoteError> {
        self.gate()?;
        self.data
            .insert((record.user_id().clone(), record.key()), record.clone());
        Ok(())
    }

    async fn delete(&self, user: &UserId, key: &R::Key) -> Result<(), RemoteError> {
        self.gate()?;
        self.data.remove(&(user.clone(), key.clone()));
        Ok(())
    }
}
