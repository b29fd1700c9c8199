use crate::core::recall::store::{RecallError, RecallStore};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;

/// A recall store whose backing implementation can be replaced at
/// runtime. In flight operations finish against the store they
/// started with.
pub struct SwappableRecallStore {
    current: ArcSwap<Arc<dyn RecallStore>>,
}

impl SwappableRecallStore {
    pub fn new(store: Arc<dyn RecallStore>) -> Self {
        Self {
            current: ArcSwap::from_pointee(store),
        }
    }

    pub fn swap(&self, store: Arc<dyn RecallStore>) {
        self.current.store(Arc::new(store));
    }

    fn live(&self) -> Arc<dyn RecallStore> {
        self.current.load().as_ref().clone()
    }
}

#[async_trait]
impl RecallStore for SwappableRecallStore {
    async fn store(&self, key: &str, value: String) -> Result<(), RecallError> {
        self.live().store(key, value).await
    }

    async fn load(&self, key: &str) -> Result<String, RecallError> {
        self.live().load(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recall::local_store::LocalRecallStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_swap_redirects_new_operations() {
        let first: Arc<dyn RecallStore> = Arc::new(LocalRecallStore::new(Duration::from_secs(60), 10));
        let second: Arc<dyn RecallStore> = Arc::new(LocalRecallStore::new(Duration::from_secs(60), 10));

        let swappable = SwappableRecallStore::new(first.clone());
        swappable.store("1", "one".into()).await.unwrap();

        swappable.swap(second.clone());
        swappable.store("2", "two".into()).await.unwrap();

        assert_eq!(first.load("1").await.unwrap(), "one");
        assert!(first.load("2").await.is_err());
        assert_eq!(second.load("2").await.unwrap(), "two");
    }
}
