use crate::app::context::StartupContext;
use crate::core::pipeline::AsyncTask;
use crate::core::providers::FileSnapshotLoader;
use crate::core::snapshot::publisher::RuntimePublisher;
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Blocks startup on the first snapshot, then keeps it fresh in the
/// background
pub struct SnapshotPublisherTask;

#[async_trait]
impl AsyncTask<StartupContext, Error> for SnapshotPublisherTask {
    #[instrument(skip_all, name = "snapshot_publisher_task")]
    async fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let loader = Arc::new(FileSnapshotLoader::new(config.snapshot.path.clone()));
        let publisher = RuntimePublisher::start(loader).await?;

        publisher.on_publish(Box::new(|snapshot| {
            info!(
                "Snapshot v{} live with {} folders",
                snapshot.version(),
                snapshot.folders().len()
            );
        }));
        publisher.spawn_refresh(config.snapshot.refresh_interval);

        context
            .publisher
            .set(publisher)
            .map_err(|_| anyhow!("Publisher already set on startup context"))
    }
}
