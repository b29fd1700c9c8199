use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::pipeline::BlockingTask;
use anyhow::Error;
use tracing::debug;

pub struct ValidateRequestTask;

impl BlockingTask<BidContext, Error> for ValidateRequestTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let span = child_span_info!("request_validate_task", invalid_reason = tracing::field::Empty).entered();

        if context.req.imp.is_empty() {
            span.record("invalid_reason", "missing_imps");
            return Err(context.no_bid("Empty imps"));
        }

        debug!("Request passed basic validation");
        span.record("invalid_reason", "none");

        Ok(())
    }
}
