use crate::core::providers::SnapshotLoader;
use crate::core::snapshot::model::SnapshotSource;
use anyhow::{Context, Error};
use async_trait::async_trait;
use config::Config;
use std::path::PathBuf;
use tracing::debug;

/// Reads the snapshot source from a local yaml or json file,
/// format chosen by extension
pub struct FileSnapshotLoader {
    path: PathBuf,
}

impl FileSnapshotLoader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn read_source(path: PathBuf) -> Result<SnapshotSource, Error> {
    let cfg = Config::builder()
        .add_source(config::File::from(path.clone()))
        .build()
        .with_context(|| format!("Failed reading snapshot source {}", path.display()))?;

    cfg.try_deserialize()
        .with_context(|| format!("Malformed snapshot source {}", path.display()))
}

#[async_trait]
impl SnapshotLoader for FileSnapshotLoader {
    async fn load(&self) -> Result<SnapshotSource, Error> {
        let path = self.path.clone();

        let source = tokio::task::spawn_blocking(move || read_source(path))
            .await
            .context("Snapshot read task failed")??;

        debug!(
            "Loaded snapshot source from {} with {} folders, {} creatives",
            self.path.display(),
            source.folders.len(),
            source.creatives.len()
        );

        Ok(source)
    }
}
