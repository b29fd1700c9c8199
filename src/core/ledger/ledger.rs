use crate::core::ledger::model::PurchaseRow;
use async_trait::async_trait;

/// Durable sink for settled purchases. One call per reconciled batch,
/// implementations decide how partial failures are handled.
#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    /// Returns how many rows were written
    async fn record(&self, rows: &[PurchaseRow]) -> Result<u64, anyhow::Error>;
}
