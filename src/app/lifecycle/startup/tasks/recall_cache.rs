use crate::app::config::RecallConfig;
use crate::app::context::StartupContext;
use crate::core::pipeline::AsyncTask;
use crate::core::recall::allocator::RecallAllocator;
use crate::core::recall::codec::RecallCodec;
use crate::core::recall::redis_store::RedisRecallStore;
use crate::core::recall::shard::ShardedRecallStore;
use crate::core::recall::store::RecallStore;
use crate::core::recall::swappable::SwappableRecallStore;
use anyhow::{Context, Error, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Builds the shard set the recall section names, one redis shard per
/// url or in process shards when no urls are configured
pub async fn build_shards(config: &RecallConfig) -> Result<ShardedRecallStore, Error> {
    if config.urls.is_empty() {
        warn!(
            "No recall urls configured, using {} in process shards",
            config.shards
        );
        return ShardedRecallStore::local(config.shards, config.ttl, config.max_capacity);
    }

    let mut shards: Vec<Arc<dyn RecallStore>> = Vec::with_capacity(config.urls.len());
    for url in &config.urls {
        shards.push(Arc::new(RedisRecallStore::connect(url, config.ttl).await?));
    }

    ShardedRecallStore::new(shards)
}

/// Builds the click token codec and the sharded recall cache shared
/// by the bid path and the win reconciler
pub struct RecallCacheTask;

#[async_trait]
impl AsyncTask<StartupContext, Error> for RecallCacheTask {
    #[instrument(skip_all, name = "recall_cache_task")]
    async fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let codec = RecallCodec::new(config.codec.key.as_bytes(), config.codec.iv.as_bytes())
            .context("Invalid codec key material")?;

        let recall = &config.recall;
        let shards = Arc::new(build_shards(recall).await?);
        let store = Arc::new(SwappableRecallStore::new(shards.clone()));
        let allocator = RecallAllocator::new(store.clone(), recall.max_attempts);

        context
            .codec
            .set(Arc::new(codec))
            .map_err(|_| anyhow!("Codec already set on startup context"))?;
        context
            .recall_shards
            .set(shards.clone())
            .map_err(|_| anyhow!("Recall shards already set on startup context"))?;
        context
            .recall_store
            .set(store)
            .map_err(|_| anyhow!("Recall store already set on startup context"))?;
        context
            .allocator
            .set(Arc::new(allocator))
            .map_err(|_| anyhow!("Recall allocator already set on startup context"))?;

        info!(
            "Recall cache ready with {} shards, ttl {:?}",
            shards.shard_count(),
            recall.ttl
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::RecallConfigBuilder;

    #[tokio::test]
    async fn test_empty_urls_build_local_shards() {
        let config = RecallConfigBuilder::default().shards(3).build().unwrap();

        let shards = build_shards(&config).await.unwrap();

        assert_eq!(shards.shard_count(), 3);
        shards.store("12", "v".into()).await.unwrap();
        assert_eq!(shards.load("12").await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_bad_shard_url_fails_build() {
        let config = RecallConfigBuilder::default()
            .urls(vec!["not a redis url".to_string()])
            .build()
            .unwrap();

        assert!(build_shards(&config).await.is_err());
    }
}
