use async_trait::async_trait;
use thiserror::Error;

use crate::record::{SyncRecord, UserId};

/// Failure of the local embedded store. Not retryable: the operation is
/// logged and dropped, since replaying a local I/O error against a possibly
/// different record state could corrupt invariants.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("local store error: {0}")]
    Backend(String),
}

/// Failure of a remote call.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("remote call timed out")]
    Timeout,
    #[error("server error: {0}")]
    Server(String),
    #[error("authentication rejected")]
    Unauthorized,
}

impl RemoteError {
    /// Transient failures are re-queued for retry. `Unauthorized` is not:
    /// it flips the authenticated bit and suppresses drains until the auth
    /// subsystem reports a fresh session.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unauthorized)
    }
}

/// CRUD over the device-local copy of one record kind.
///
/// The store holds a single user's data; keys alone identify records.
/// Implemented by thin adapters over the embedded store (and by
/// [`super::InMemoryLocalStore`] for tests).
#[async_trait]
pub trait LocalStore<R: SyncRecord>: Send + Sync {
    async fn list_all(&self) -> Result<Vec<R>, StorageError>;
    async fn get(&self, key: &R::Key) -> Result<Option<R>, StorageError>;
    async fn upsert(&self, record: &R) -> Result<(), StorageError>;
    async fn delete(&self, key: &R::Key) -> Result<(), StorageError>;
}

/// CRUD over the remote authoritative collection for one record kind,
/// keyed by `(user, key)`. The adapter owns transport and serialization.
#[async_trait]
pub trait RemoteStore<R: SyncRecord>: Send + Sync {
    /// The combined "download everything for this user" query.
    async fn fetch_all(&self, user: &UserId) -> Result<Vec<R>, RemoteError>;
    async fn get(&self, user: &UserId, key: &R::Key) -> Result<Option<R>, RemoteError>;
    async fn insert(&self, record: &R) -> Result<(), RemoteError>;
    async fn update(&self, record: &R) -> Result<(), RemoteError>;
    async fn delete(&self, user: &UserId, key: &R::Key) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Network("reset".into()).is_transient());
        assert!(RemoteError::Timeout.is_transient());
        assert!(RemoteError::Server("500".into()).is_transient());
        assert!(!RemoteError::Unauthorized.is_transient());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(RemoteError::Timeout.to_string(), "remote call timed out");
        assert_eq!(
            StorageError::Backend("disk full".into()).to_string(),
            "local store error: disk full"
        );
    }
}
