use crate::app::config::{BiddingConfig, EventConfig};
use crate::app::pipeline::bid::{BidContext, tasks};
use crate::app::span::WrappedPipelineTask;
use crate::core::bidding::macros::win_notice_url;
use crate::core::bidding::strategy::BiddingStrategy;
use crate::core::pipeline::{Pipeline, PipelineBuilder};
use crate::core::recall::allocator::RecallAllocator;
use crate::core::recall::codec::RecallCodec;
use crate::sample_or_attach_root_span;
use anyhow::{Error, anyhow};
use std::sync::Arc;

/// Shared collaborators the bid tasks are built from
pub struct BidPipelineDeps {
    pub strategy: Arc<dyn BiddingStrategy>,
    pub allocator: Arc<RecallAllocator>,
    pub codec: Arc<RecallCodec>,
}

/// Builds the pipeline a decoded auction request flows through.
///
/// # Behavior
/// * Observability - Runs under a sampled `bid_request` root span, or
///   attaches to an active parent
/// * BidResponseState - Every no-bid path assigns `res` before
///   returning an error. An error with `res` unset is an internal
///   failure, e.g. the recall store was unavailable.
pub fn build_bid_pipeline(
    deps: BidPipelineDeps,
    bidding: &BiddingConfig,
    events: &EventConfig,
    span_sample_rate: f32,
) -> Result<Pipeline<BidContext, Error>, Error> {
    let nurl = win_notice_url(&events.domain, &events.win_path);

    let bid_pipeline = PipelineBuilder::new()
        .with_blocking(Box::new(tasks::TestTrafficTask::new(bidding.test_only)))
        .with_blocking(Box::new(tasks::ValidateRequestTask))
        .with_blocking(Box::new(tasks::ResolveDimensionsTask))
        .with_blocking(Box::new(tasks::FolderMatchingTask))
        .with_blocking(Box::new(tasks::SelectionTask::new(deps.strategy.clone())))
        .with_blocking(Box::new(tasks::PricingTask::new(deps.strategy.clone())))
        .with_async(Box::new(tasks::RecallStoreTask::new(deps.allocator)))
        .with_blocking(Box::new(tasks::BuildBidTask::new(
            deps.codec,
            deps.strategy,
            nurl,
        )))
        .build()
        .ok_or_else(|| anyhow!("Bid pipeline has no tasks"))?;

    let observed = WrappedPipelineTask::new(bid_pipeline, move || {
        sample_or_attach_root_span!(span_sample_rate, "bid_request")
    });

    PipelineBuilder::new()
        .with_async(Box::new(observed))
        .build()
        .ok_or_else(|| anyhow!("Bid pipeline has no tasks"))
}
