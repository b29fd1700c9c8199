use crate::core::recall::store::{RecallError, RecallStore};
use async_trait::async_trait;
use moka::sync::{Cache, CacheBuilder};
use std::time::Duration;

/// In process recall store backed by a TTL cache. Entries expire
/// after the configured ttl regardless of reads.
pub struct LocalRecallStore {
    cache: Cache<String, String>,
}

impl LocalRecallStore {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: CacheBuilder::new(max_capacity).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl RecallStore for LocalRecallStore {
    async fn store(&self, key: &str, value: String) -> Result<(), RecallError> {
        let entry = self.cache.entry(key.to_string()).or_insert_with(|| value);

        if entry.is_fresh() {
            Ok(())
        } else {
            Err(RecallError::Conflict(key.to_string()))
        }
    }

    async fn load(&self, key: &str) -> Result<String, RecallError> {
        self.cache
            .get(key)
            .ok_or_else(|| RecallError::Miss(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_is_insert_if_absent() {
        let store = LocalRecallStore::new(Duration::from_secs(600), 100);

        store.store("7", "first".into()).await.unwrap();
        let conflict = store.store("7", "second".into()).await;

        assert!(matches!(conflict, Err(RecallError::Conflict(key)) if key == "7"));
        assert_eq!(store.load("7").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_missing_key_is_miss() {
        let store = LocalRecallStore::new(Duration::from_secs(600), 100);

        assert!(matches!(store.load("nope").await, Err(RecallError::Miss(_))));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = LocalRecallStore::new(Duration::from_millis(50), 100);

        store.store("1", "value".into()).await.unwrap();
        std::thread::sleep(Duration::from_millis(120));

        assert!(matches!(store.load("1").await, Err(RecallError::Miss(_))));
        assert!(store.store("1", "again".into()).await.is_ok());
    }
}
