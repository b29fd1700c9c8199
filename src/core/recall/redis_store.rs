use crate::core::recall::store::{RecallError, RecallStore};
use anyhow::{Context, Error, anyhow};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

/// Recall shard on a shared redis, so a win notice resolves no matter
/// which instance answered the bid. Records expire server side after
/// the ttl given at store time.
pub struct RedisRecallStore {
    conn: ConnectionManager,
    ttl_secs: u64,
    url: String,
}

impl RedisRecallStore {
    /// Connects and pings once, a shard that cannot answer fails the build
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, Error> {
        let client = redis::Client::open(url).with_context(|| format!("Invalid redis url {}", url))?;
        let mut conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("Failed connecting redis recall shard {}", url))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Redis recall shard {} did not answer ping", url))?;

        info!("Connected redis recall shard {}", url);

        Ok(RedisRecallStore {
            conn,
            ttl_secs: ttl.as_secs().max(1),
            url: url.to_string(),
        })
    }
}

/// `SET NX` answers OK when written and nil when the key was taken
fn store_reply(key: &str, reply: Option<String>) -> Result<(), RecallError> {
    match reply {
        Some(_) => Ok(()),
        None => Err(RecallError::Conflict(key.to_string())),
    }
}

fn load_reply(key: &str, reply: Option<String>) -> Result<String, RecallError> {
    reply.ok_or_else(|| RecallError::Miss(key.to_string()))
}

#[async_trait]
impl RecallStore for RedisRecallStore {
    async fn store(&self, key: &str, value: String) -> Result<(), RecallError> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow!("Redis store on {} failed: {}", self.url, e))?;

        store_reply(key, reply)
    }

    async fn load(&self, key: &str) -> Result<String, RecallError> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow!("Redis load on {} failed: {}", self.url, e))?;

        load_reply(key, reply)
    }
}
