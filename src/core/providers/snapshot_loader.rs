use crate::core::snapshot::model::SnapshotSource;
use async_trait::async_trait;

/// Source of bidding configuration. Each call returns a complete,
/// unvalidated view, the publisher turns it into a snapshot.
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    async fn load(&self) -> Result<SnapshotSource, anyhow::Error>;
}

/// Serves a fixed source, used to drive the publisher in tests
#[cfg(test)]
pub struct StaticSnapshotLoader {
    source: parking_lot::Mutex<Result<SnapshotSource, String>>,
}

#[cfg(test)]
impl StaticSnapshotLoader {
    pub fn new(source: SnapshotSource) -> Self {
        Self {
            source: parking_lot::Mutex::new(Ok(source)),
        }
    }

    pub fn set(&self, source: SnapshotSource) {
        *self.source.lock() = Ok(source);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.source.lock() = Err(reason.to_string());
    }
}

#[cfg(test)]
#[async_trait]
impl SnapshotLoader for StaticSnapshotLoader {
    async fn load(&self) -> Result<SnapshotSource, anyhow::Error> {
        self.source.lock().clone().map_err(anyhow::Error::msg)
    }
}
