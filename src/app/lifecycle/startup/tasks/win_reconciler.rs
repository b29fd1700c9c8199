use crate::app::context::StartupContext;
use crate::core::pipeline::BlockingTask;
use crate::core::reconciler::{ReconcilerDeps, WinReconciler};
use anyhow::{Error, anyhow};
use std::sync::Arc;
use tracing::{info, instrument};

/// Starts the win batching loop and exposes its queue to the server
pub struct WinReconcilerTask;

impl BlockingTask<StartupContext, Error> for WinReconcilerTask {
    #[instrument(skip_all, name = "win_reconciler_task")]
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let recalls = context
            .recall_store
            .get()
            .ok_or_else(|| anyhow!("Recall store not built before win reconciler"))?
            .clone();
        let ledger = context
            .ledger
            .get()
            .ok_or_else(|| anyhow!("Ledger not connected before win reconciler"))?
            .clone();
        let codec = context
            .codec
            .get()
            .ok_or_else(|| anyhow!("Codec not built before win reconciler"))?
            .clone();

        let reconciler = Arc::new(WinReconciler::new(
            ReconcilerDeps { recalls, ledger },
            codec,
            config.reconciler.max_batch,
            config.reconciler.batch_timeout,
        ));
        let queue = reconciler.start(config.reconciler.queue_depth);

        context
            .reconciler
            .set(reconciler)
            .map_err(|_| anyhow!("Reconciler already set on startup context"))?;
        context
            .win_queue
            .set(queue)
            .map_err(|_| anyhow!("Win queue already set on startup context"))?;

        info!(
            "Win reconciler started, batches of {} or every {:?}",
            config.reconciler.max_batch, config.reconciler.batch_timeout
        );

        Ok(())
    }
}
