use crate::app::config::{LedgerConfig, RecallConfig};
use crate::app::context::StartupContext;
use crate::app::lifecycle::startup::tasks::ledger::connect_ledger;
use crate::app::lifecycle::startup::tasks::recall_cache::build_shards;
use crate::core::config_manager::{ConfigChange, ConfigManager};
use crate::core::ledger::PurchaseLedger;
use crate::core::pipeline::BlockingTask;
use crate::core::recall::shard::ShardedRecallStore;
use crate::core::recall::swappable::SwappableRecallStore;
use crate::core::reconciler::{ReconcilerDeps, WinReconciler};
use anyhow::{Error, anyhow};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

struct Applied {
    recall: RecallConfig,
    ledger: LedgerConfig,
    shards: Arc<ShardedRecallStore>,
    ledger_handle: Arc<dyn PurchaseLedger>,
}

/// Re-reads the config file and rebuilds the recall shards or the
/// ledger when their sections differ from what is running.
///
/// A rebuilt shard set reads through to the previous generations, so
/// recall records written before a change stay reachable until they
/// expire. Generations whose records have all expired are dropped from
/// the chain on the next rebuild.
pub struct DependencyRefresher {
    manager: Arc<ConfigManager>,
    recalls: Arc<SwappableRecallStore>,
    reconciler: Arc<WinReconciler>,
    applied: Mutex<Applied>,
}

impl DependencyRefresher {
    pub fn new(
        manager: Arc<ConfigManager>,
        recall: RecallConfig,
        ledger: LedgerConfig,
        shards: Arc<ShardedRecallStore>,
        ledger_handle: Arc<dyn PurchaseLedger>,
        recalls: Arc<SwappableRecallStore>,
        reconciler: Arc<WinReconciler>,
    ) -> Self {
        DependencyRefresher {
            manager,
            recalls,
            reconciler,
            applied: Mutex::new(Applied {
                recall,
                ledger,
                shards,
                ledger_handle,
            }),
        }
    }

    /// One refresh pass. A section whose rebuild fails stays on the
    /// running dependency and is retried next pass.
    pub async fn cycle(&self) -> Result<ConfigChange, Error> {
        self.manager.reload()?;
        let config = self.manager.get()?.clone();

        let (change, previous_shards, previous_recall_ttl) = {
            let applied = self.applied.lock();
            let change = ConfigChange {
                recall: applied.recall != config.recall,
                ledger: applied.ledger != config.ledger,
            };

            (change, applied.shards.clone(), applied.recall.ttl)
        };

        if !change.any() {
            return Ok(change);
        }

        // ledger first, a failed connect leaves everything untouched
        let ledger = if change.ledger {
            Some(connect_ledger(&config.ledger).await?)
        } else {
            None
        };

        let shards = if change.recall {
            let recall = &config.recall;
            // the outgoing set took writes until now and is always kept
            let previous = previous_shards.retain_live(recall.ttl.max(previous_recall_ttl));
            let shards = build_shards(recall)
                .await?
                .with_fallback(Arc::new(previous));

            Some(Arc::new(shards))
        } else {
            None
        };

        let ledger_handle = {
            let mut applied = self.applied.lock();

            if let Some(ledger) = ledger {
                applied.ledger = config.ledger.clone();
                applied.ledger_handle = ledger;
            }

            if let Some(shards) = shards {
                info!(
                    "Recall shards rebuilt, {} -> {}, {} generations readable",
                    applied.shards.shard_count(),
                    shards.shard_count(),
                    shards.generations()
                );

                self.recalls.swap(shards.clone());
                applied.recall = config.recall.clone();
                applied.shards = shards;
            }

            applied.ledger_handle.clone()
        };

        self.reconciler.reconfigure(ReconcilerDeps {
            recalls: self.recalls.clone(),
            ledger: ledger_handle,
        });

        Ok(change)
    }

    pub fn spawn(self: Arc<Self>, interval: Duration, stop: Arc<Notify>) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        match self.cycle().await {
                            Ok(change) if change.any() => info!("Dependencies refreshed: {:?}", change),
                            Ok(_) => debug!("Dependencies unchanged"),
                            Err(e) => warn!("Dependency refresh failed, keeping current: {:#}", e),
                        }
                    }
                    _ = stop.notified() => break,
                }
            }

            info!("Dependency refresh stopped");
        });
    }
}

/// Starts the dependency refresh loop on the snapshot refresh interval
pub struct DependencyRefreshTask;

impl BlockingTask<StartupContext, Error> for DependencyRefreshTask {
    #[instrument(skip_all, name = "dependency_refresh_task")]
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let missing = || anyhow!("Dependencies not built before dependency refresh");
        let refresher = DependencyRefresher::new(
            context.config_manager.get().ok_or_else(missing)?.clone(),
            config.recall.clone(),
            config.ledger.clone(),
            context.recall_shards.get().ok_or_else(missing)?.clone(),
            context.ledger.get().ok_or_else(missing)?.clone(),
            context.recall_store.get().ok_or_else(missing)?.clone(),
            context.reconciler.get().ok_or_else(missing)?.clone(),
        );

        let stop = Arc::new(Notify::new());
        Arc::new(refresher).spawn(config.snapshot.refresh_interval, stop.clone());

        context
            .dependency_refresh_stop
            .set(stop)
            .map_err(|_| anyhow!("Dependency refresh already started"))
    }
}
