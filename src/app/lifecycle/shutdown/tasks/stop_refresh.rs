use crate::app::lifecycle::context::StartupContext;
use crate::core::pipeline::BlockingTask;
use anyhow::Error;
use tracing::{info, instrument};

/// Stops the snapshot and dependency refresh loops. Win notices
/// already queued still drain through the reconciler.
pub struct StopRefreshTask;

impl BlockingTask<StartupContext, Error> for StopRefreshTask {
    #[instrument(skip_all, name = "stop_refresh_task")]
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        if let Some(publisher) = context.publisher.get() {
            publisher.stop();
        }

        if let Some(stop) = context.dependency_refresh_stop.get() {
            stop.notify_one();
        }

        info!("Stopped background refresh");

        Ok(())
    }
}
