use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::pipeline::AsyncTask;
use crate::core::recall::allocator::RecallAllocator;
use crate::core::recall::model::RecallRecord;
use anyhow::{Context, Error, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// Persists the decision under a fresh recall id so the win notice
/// can be settled later. Failure aborts the request without a bid.
pub struct RecallStoreTask {
    allocator: Arc<RecallAllocator>,
}

impl RecallStoreTask {
    pub fn new(allocator: Arc<RecallAllocator>) -> Self {
        Self { allocator }
    }

    async fn run0(&self, context: &BidContext) -> Result<(), Error> {
        let selection = context
            .selection
            .get()
            .ok_or_else(|| anyhow!("No selection on context before recall store"))?;
        let pricing = context
            .pricing
            .get()
            .ok_or_else(|| anyhow!("No pricing on context before recall store"))?;
        let dims = context
            .dims
            .get()
            .ok_or_else(|| anyhow!("No dimensions on context before recall store"))?;

        let record = RecallRecord {
            folder: selection.folder,
            creative: selection.creative,
            full_price: pricing.full_price,
            margin: pricing.margin,
            dims: *dims,
            test: context.req.test,
        };

        let id = self
            .allocator
            .allocate(&record.to_json()?)
            .await
            .context("Failed to store recall record")?;

        context
            .recall_id
            .set(id)
            .map_err(|_| anyhow!("Recall id already assigned on context"))
    }
}

#[async_trait]
impl AsyncTask<BidContext, Error> for RecallStoreTask {
    async fn run(&self, context: &BidContext) -> Result<(), Error> {
        let span = child_span_info!("recall_store_task");

        self.run0(context).instrument(span).await
    }
}
