use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecallError {
    /// The key is already held by a live record
    #[error("recall key {0} already present")]
    Conflict(String),
    #[error("recall key {0} not found")]
    Miss(String),
    #[error("no free recall id after {0} attempts")]
    Exhausted(u32),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A short lived key value backend holding recall records between
/// a bid and its win notice. Implementations must make `store`
/// atomic, a key that is already present is never overwritten.
#[async_trait]
pub trait RecallStore: Send + Sync {
    /// Insert only if absent, failing with [`RecallError::Conflict`] otherwise
    async fn store(&self, key: &str, value: String) -> Result<(), RecallError>;

    async fn load(&self, key: &str) -> Result<String, RecallError>;
}
