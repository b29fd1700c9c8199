use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::bidding::strategy::BiddingStrategy;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use std::sync::Arc;
use tracing::debug;

/// Lets the strategy pick a folder and creative from the candidates
pub struct SelectionTask {
    strategy: Arc<dyn BiddingStrategy>,
}

impl SelectionTask {
    pub fn new(strategy: Arc<dyn BiddingStrategy>) -> Self {
        Self { strategy }
    }
}

impl BlockingTask<BidContext, Error> for SelectionTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let _span = child_span_info!("selection_task").entered();

        let candidates = context
            .candidates
            .get()
            .ok_or_else(|| anyhow!("No candidates on context before selection"))?;

        let selection = match self.strategy.select(&context.req, &context.snapshot, candidates) {
            Some(selection) => selection,
            None => return Err(context.no_bid("Strategy declined all candidates")),
        };

        debug!(
            "Selected folder {} creative {}",
            selection.folder, selection.creative
        );

        context
            .selection
            .set(selection)
            .map_err(|_| anyhow!("Selection already assigned on context"))
    }
}
