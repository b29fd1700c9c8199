/// Pipeline an auction request flows through to produce a bid or a
/// no-bid
pub mod bid;
