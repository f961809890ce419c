use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{LocalStore, StorageError};
use crate::record::SyncRecord;

/// In-memory [`LocalStore`], keyed by the record's merge identity.
///
/// The default local adapter until a real embedded store is wired in, and
/// the test double throughout the suite.
pub struct InMemoryLocalStore<R: SyncRecord> {
    data: DashMap<R::Key, R>,
}

impl<R: SyncRecord> InMemoryLocalStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self { data: DashMap::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&self) {
        self.data.clear();
    }
}

impl<R: SyncRecord> Default for InMemoryLocalStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: SyncRecord> LocalStore<R> for InMemoryLocalStore<R> {
    async fn list_all(&self) -> Result<Vec<R>, StorageError> {
        Ok(self.data.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn get(&self, key: &R::Key) -> Result<Option<R>, StorageError> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, record: &R) -> Result<(), StorageError> {
        self.data.insert(record.key(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &R::Key) -> Result<(), StorageError> {
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CalendarDate, SnapshotRecord, UserId};

    fn snapshot(date: &str, plan: &str) -> SnapshotRecord {
        SnapshotRecord::new(
            UserId::new("u-1"),
            CalendarDate::new(date),
            "{}".to_string(),
            plan.to_string(),
        )
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store: InMemoryLocalStore<SnapshotRecord> = InMemoryLocalStore::new();
        assert!(store.is_empty());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryLocalStore::new();
        store.upsert(&snapshot("2024-02-01", "p1")).await.unwrap();

        let got = store.get(&CalendarDate::new("2024-02-01")).await.unwrap().unwrap();
        assert_eq!(got.plan_json, "p1");
        assert!(store.get(&CalendarDate::new("2024-02-02")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_same_date_overwrites() {
        let store = InMemoryLocalStore::new();
        store.upsert(&snapshot("2024-02-01", "p1")).await.unwrap();
        store.upsert(&snapshot("2024-02-01", "p2")).await.unwrap();

        assert_eq!(store.len(), 1);
        let got = store.get(&CalendarDate::new("2024-02-01")).await.unwrap().unwrap();
        assert_eq!(got.plan_json, "p2");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryLocalStore::new();
        store.upsert(&snapshot("2024-02-01", "p1")).await.unwrap();
        store.delete(&CalendarDate::new("2024-02-01")).await.unwrap();
        assert!(store.is_empty());

        // Deleting a missing key is not an error.
        store.delete(&CalendarDate::new("2024-02-01")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_all() {
        let store = InMemoryLocalStore::new();
        for day in ["2024-02-01", "2024-02-02", "2024-02-03"] {
            store.upsert(&snapshot(day, "p")).await.unwrap();
        }
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }
}
