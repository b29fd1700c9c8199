use crate::core::recall::local_store::LocalRecallStore;
use crate::core::recall::store::{RecallError, RecallStore};
use anyhow::{Error, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Picks the shard owning a key. Numeric keys route by value so
/// sequential ids spread evenly, anything else routes by crc32.
pub fn shard_index(key: &str, shard_count: usize) -> usize {
    let hash = match key.parse::<u64>() {
        Ok(id) => id,
        Err(_) => crc32fast::hash(key.as_bytes()) as u64,
    };

    (hash % shard_count as u64) as usize
}

/// Deterministically partitions recall keys across a fixed set of
/// child stores. Loads that fail on the owning shard are retried
/// against the previous shard generation, which lets a rebuilt shard
/// set keep serving records written before the rebuild.
pub struct ShardedRecallStore {
    shards: Vec<Arc<dyn RecallStore>>,
    fallback: Option<Arc<ShardedRecallStore>>,
    built_at: Instant,
}

impl ShardedRecallStore {
    pub fn new(shards: Vec<Arc<dyn RecallStore>>) -> Result<Self, Error> {
        if shards.is_empty() {
            bail!("Sharded recall store requires at least one shard");
        }

        Ok(ShardedRecallStore {
            shards,
            fallback: None,
            built_at: Instant::now(),
        })
    }

    /// Builds `count` in process shards sharing one ttl, splitting
    /// the total capacity evenly between them
    pub fn local(count: usize, ttl: Duration, max_capacity: u64) -> Result<Self, Error> {
        let per_shard = max_capacity / count.max(1) as u64;

        let shards = (0..count)
            .map(|_| Arc::new(LocalRecallStore::new(ttl, per_shard)) as Arc<dyn RecallStore>)
            .collect();

        Self::new(shards)
    }

    pub fn with_fallback(mut self, fallback: Arc<ShardedRecallStore>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// The same shard set, keeping only the older generations that may
    /// still hold live records. Generation `n - 1` stopped taking writes
    /// when `n` was built, so it is dropped once `n` is older than `ttl`.
    pub fn retain_live(&self, ttl: Duration) -> Self {
        let fallback = match &self.fallback {
            Some(previous) if self.built_at.elapsed() < ttl => Some(Arc::new(previous.retain_live(ttl))),
            _ => None,
        };

        ShardedRecallStore {
            shards: self.shards.clone(),
            fallback,
            built_at: self.built_at,
        }
    }

    /// Number of shard sets a load may consult, this one included
    pub fn generations(&self) -> usize {
        1 + self.fallback.as_ref().map_or(0, |previous| previous.generations())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn owner(&self, key: &str) -> &Arc<dyn RecallStore> {
        &self.shards[shard_index(key, self.shards.len())]
    }
}

#[async_trait]
impl RecallStore for ShardedRecallStore {
    async fn store(&self, key: &str, value: String) -> Result<(), RecallError> {
        self.owner(key).store(key, value).await
    }

    async fn load(&self, key: &str) -> Result<String, RecallError> {
        match self.owner(key).load(key).await {
            Ok(value) => Ok(value),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    debug!("Recall key {} unavailable on shard ({}), trying fallback", key, err);
                    fallback.load(key).await
                }
                None => Err(err),
            },
        }
    }
}
