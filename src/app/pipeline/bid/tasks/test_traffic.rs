use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::pipeline::BlockingTask;
use anyhow::Error;

/// Drops live traffic when the bidder runs in test-only mode
pub struct TestTrafficTask {
    test_only: bool,
}

impl TestTrafficTask {
    pub fn new(test_only: bool) -> Self {
        Self { test_only }
    }
}

impl BlockingTask<BidContext, Error> for TestTrafficTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let _span = child_span_info!("test_traffic_task", test = context.req.test).entered();

        if self.test_only && !context.req.test {
            return Err(context.no_bid("Live traffic while in test-only mode"));
        }

        Ok(())
    }
}
