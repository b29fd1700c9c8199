use crate::app::context::StartupContext;
use crate::app::pipeline::bid::{BidPipelineDeps, build_bid_pipeline};
use crate::core::bidding::strategy::UniformStrategy;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct BuildBidPipelineTask;

impl BlockingTask<StartupContext, Error> for BuildBidPipelineTask {
    #[instrument(skip_all, name = "build_bid_pipeline_task")]
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let allocator = context
            .allocator
            .get()
            .ok_or_else(|| anyhow!("Recall allocator not built before bid pipeline"))?
            .clone();
        let codec = context
            .codec
            .get()
            .ok_or_else(|| anyhow!("Codec not built before bid pipeline"))?
            .clone();

        let pipeline = build_bid_pipeline(
            BidPipelineDeps {
                strategy: Arc::new(UniformStrategy::new(config.bidding.revenue_share)),
                allocator,
                codec,
            },
            &config.bidding,
            &config.notifications,
            config.logging.span_sample_rate,
        )?;

        context
            .bid_pipeline
            .set(Arc::new(pipeline))
            .map_err(|_| anyhow!("Bid pipeline already set on startup context"))?;

        info!(
            "Bid pipeline built, revenue share {}%{}",
            config.bidding.revenue_share,
            if config.bidding.test_only { ", test traffic only" } else { "" }
        );

        Ok(())
    }
}
