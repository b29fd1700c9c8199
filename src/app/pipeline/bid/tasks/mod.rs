mod build_bid;
mod dimensions;
mod folder_matching;
mod pricing;
mod recall_store;
mod selection;
mod test_traffic;
mod validate;

pub use build_bid::BuildBidTask;
pub use dimensions::ResolveDimensionsTask;
pub use folder_matching::FolderMatchingTask;
pub use pricing::PricingTask;
pub use recall_store::RecallStoreTask;
pub use selection::SelectionTask;
pub use test_traffic::TestTrafficTask;
pub use validate::ValidateRequestTask;
