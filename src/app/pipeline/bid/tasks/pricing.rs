use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::bidding::pricing::price_bid;
use crate::core::bidding::strategy::BiddingStrategy;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use std::sync::Arc;

pub struct PricingTask {
    strategy: Arc<dyn BiddingStrategy>,
}

impl PricingTask {
    pub fn new(strategy: Arc<dyn BiddingStrategy>) -> Self {
        Self { strategy }
    }
}

impl BlockingTask<BidContext, Error> for PricingTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let span = child_span_info!(
            "pricing_task",
            bid_price = tracing::field::Empty,
            margin = tracing::field::Empty
        )
        .entered();

        let selection = context
            .selection
            .get()
            .ok_or_else(|| anyhow!("No selection on context before pricing"))?;

        let share = self.strategy.revenue_share(&context.req, selection);
        let pricing = price_bid(selection.full_price, share);

        span.record("bid_price", pricing.bid_price);
        span.record("margin", pricing.margin);

        context
            .pricing
            .set(pricing)
            .map_err(|_| anyhow!("Pricing already assigned on context"))
    }
}
