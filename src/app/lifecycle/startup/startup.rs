use crate::app::lifecycle::context::StartupContext;
use crate::app::lifecycle::startup::tasks::bid_pipeline::BuildBidPipelineTask;
use crate::app::lifecycle::startup::tasks::config_load::ConfigLoadTask;
use crate::app::lifecycle::startup::tasks::dependency_refresh::DependencyRefreshTask;
use crate::app::lifecycle::startup::tasks::ledger::LedgerTask;
use crate::app::lifecycle::startup::tasks::observability::ConfigureObservabilityTask;
use crate::app::lifecycle::startup::tasks::recall_cache::RecallCacheTask;
use crate::app::lifecycle::startup::tasks::snapshot_publisher::SnapshotPublisherTask;
use crate::app::lifecycle::startup::tasks::start_server::StartServerTask;
use crate::app::lifecycle::startup::tasks::win_reconciler::WinReconcilerTask;
use crate::core::config_manager::ConfigManager;
use crate::core::pipeline::{Pipeline, PipelineBuilder};
use anyhow::{Error, anyhow};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds the ordered startup pipeline. Each task attaches what it
/// built to the `StartupContext` for the tasks after it, and for
/// shutdown.
pub fn build_start_pipeline(cfg_path: PathBuf) -> Result<Pipeline<StartupContext, Error>, Error> {
    let cfg_manager = Arc::new(ConfigManager::new(cfg_path));

    PipelineBuilder::new()
        .with_blocking(Box::new(ConfigLoadTask::new(cfg_manager)))
        .with_blocking(Box::new(ConfigureObservabilityTask))
        .with_async(Box::new(RecallCacheTask))
        .with_async(Box::new(LedgerTask))
        .with_async(Box::new(SnapshotPublisherTask))
        .with_blocking(Box::new(WinReconcilerTask))
        .with_blocking(Box::new(DependencyRefreshTask))
        .with_blocking(Box::new(BuildBidPipelineTask))
        .with_async(Box::new(StartServerTask))
        .build()
        .ok_or_else(|| anyhow!("Startup pipeline should have tasks"))
}
