use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::bidding::matching::find_candidates;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use tracing::debug;

/// Walks the snapshot's folder tree for folders targeting this request
pub struct FolderMatchingTask;

impl BlockingTask<BidContext, Error> for FolderMatchingTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let span = child_span_info!("folder_matching_task", candidates = tracing::field::Empty).entered();

        let dims = context
            .dims
            .get()
            .ok_or_else(|| anyhow!("Dimensions not resolved before folder matching"))?;
        let bid_floor = context.req.imp.first().map_or(0, |imp| imp.bidfloor);

        let set = find_candidates(&context.snapshot, dims, context.req.test, bid_floor);
        span.record("candidates", set.candidates.len());

        if set.is_empty() {
            return Err(context.no_bid("No folders matched"));
        }

        debug!(
            "{} candidate folders, total cpc {}",
            set.candidates.len(),
            set.total_cpc
        );

        context
            .candidates
            .set(set)
            .map_err(|_| anyhow!("Candidates already assigned on context"))
    }
}
