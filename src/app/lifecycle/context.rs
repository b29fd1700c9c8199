use crate::app::config::RdspConfig;
use crate::app::pipeline::bid::BidContext;
use crate::core::config_manager::ConfigManager;
use crate::core::events::WinNotice;
use crate::core::ledger::PurchaseLedger;
use crate::core::observability::OtelProviders;
use crate::core::pipeline::Pipeline;
use crate::core::recall::allocator::RecallAllocator;
use crate::core::recall::codec::RecallCodec;
use crate::core::recall::shard::ShardedRecallStore;
use crate::core::recall::swappable::SwappableRecallStore;
use crate::core::reconciler::WinReconciler;
use crate::core::snapshot::publisher::RuntimePublisher;
use actix_web::dev::ServerHandle;
use anyhow::{Error, anyhow};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Notify, mpsc};

/// Everything startup builds, in the order it is built. Shutdown
/// tasks tear down whatever was assigned.
#[derive(Default)]
pub struct StartupContext {
    pub config_manager: OnceLock<Arc<ConfigManager>>,
    /// Set only when otel export is configured
    pub observability: OnceLock<OtelProviders>,

    // Shared collaborators
    pub codec: OnceLock<Arc<RecallCodec>>,
    /// Shard set built at startup, the dependency refresher owns
    /// later generations
    pub recall_shards: OnceLock<Arc<ShardedRecallStore>>,
    /// Stable handle the bid path and reconciler both use
    pub recall_store: OnceLock<Arc<SwappableRecallStore>>,
    pub allocator: OnceLock<Arc<RecallAllocator>>,
    pub ledger: OnceLock<Arc<dyn PurchaseLedger>>,
    pub publisher: OnceLock<Arc<RuntimePublisher>>,
    pub reconciler: OnceLock<Arc<WinReconciler>>,
    pub win_queue: OnceLock<mpsc::Sender<WinNotice>>,
    pub dependency_refresh_stop: OnceLock<Arc<Notify>>,

    // Pipelines
    pub bid_pipeline: OnceLock<Arc<Pipeline<BidContext, Error>>>,

    /// The web server
    pub server: OnceLock<ServerHandle>,
}

impl StartupContext {
    /// Copy of the current config, so no lock is held across awaits
    pub fn config(&self) -> Result<RdspConfig, Error> {
        let manager = self
            .config_manager
            .get()
            .ok_or_else(|| anyhow!("Config manager not set on startup context"))?;

        Ok(manager.get()?.clone())
    }
}
