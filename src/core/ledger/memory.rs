use crate::core::ledger::ledger::PurchaseLedger;
use crate::core::ledger::model::PurchaseRow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Keeps purchases in process, for local runs and tests
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<PurchaseRow>>,
}

impl MemoryLedger {
    pub fn rows(&self) -> Vec<PurchaseRow> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl PurchaseLedger for MemoryLedger {
    async fn record(&self, rows: &[PurchaseRow]) -> Result<u64, anyhow::Error> {
        for row in rows {
            debug!(
                "Purchase sale {} folder {} creative {} rev {}",
                row.sale_id, row.folder_id, row.creative_id, row.rev_tx
            );
        }

        self.rows.lock().extend_from_slice(rows);

        Ok(rows.len() as u64)
    }
}
