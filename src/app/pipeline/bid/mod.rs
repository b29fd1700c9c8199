mod context;
mod decide;
mod pipeline;
mod tasks;
#[cfg(test)]
pub(crate) mod testing;

pub use context::BidContext;
pub use decide::{BidOutcome, decide};
pub use pipeline::{BidPipelineDeps, build_bid_pipeline};
