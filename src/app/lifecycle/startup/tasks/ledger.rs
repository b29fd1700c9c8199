use crate::app::config::LedgerConfig;
use crate::app::context::StartupContext;
use crate::core::ledger::{MemoryLedger, PostgresLedger, PurchaseLedger};
use crate::core::pipeline::AsyncTask;
use anyhow::{Context, Error, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Connects the purchase ledger named by the config
pub async fn connect_ledger(config: &LedgerConfig) -> Result<Arc<dyn PurchaseLedger>, Error> {
    match config {
        LedgerConfig::Memory => {
            warn!("Using in memory ledger, purchases will not be persisted");
            Ok(Arc::new(MemoryLedger::default()))
        }
        LedgerConfig::Postgres {
            url,
            max_connections,
            acquire_timeout,
        } => {
            let ledger = PostgresLedger::connect(url, *max_connections, *acquire_timeout)
                .await
                .context("Failed connecting postgres ledger")?;

            info!("Connected postgres ledger");
            Ok(Arc::new(ledger))
        }
    }
}

pub struct LedgerTask;

#[async_trait]
impl AsyncTask<StartupContext, Error> for LedgerTask {
    #[instrument(skip_all, name = "ledger_task")]
    async fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;
        let ledger = connect_ledger(&config.ledger).await?;

        context
            .ledger
            .set(ledger)
            .map_err(|_| anyhow!("Ledger already set on startup context"))
    }
}
