use crate::core::bidding::matching::CandidateSet;
use crate::core::bidding::pricing::Pricing;
use crate::core::bidding::strategy::Selection;
use crate::core::models::ortb::{BidRequest, BidResponseState};
use crate::core::snapshot::model::{ConfigSnapshot, Dimensions};
use anyhow::{Error, anyhow};
use std::sync::{Arc, OnceLock};

/// Per request state shared by the bid pipeline tasks. The snapshot
/// is captured once when the request arrives and used throughout.
pub struct BidContext {
    pub req: BidRequest,
    pub snapshot: Arc<ConfigSnapshot>,
    pub dims: OnceLock<Dimensions>,
    pub candidates: OnceLock<CandidateSet>,
    pub selection: OnceLock<Selection>,
    pub pricing: OnceLock<Pricing>,
    pub recall_id: OnceLock<u64>,
    pub res: OnceLock<BidResponseState>,
}

impl BidContext {
    pub fn new(req: BidRequest, snapshot: Arc<ConfigSnapshot>) -> Self {
        BidContext {
            req,
            snapshot,
            dims: OnceLock::new(),
            candidates: OnceLock::new(),
            selection: OnceLock::new(),
            pricing: OnceLock::new(),
            recall_id: OnceLock::new(),
            res: OnceLock::new(),
        }
    }

    /// Records a no-bid outcome and returns the error that stops the
    /// pipeline. An outcome assigned earlier wins.
    pub fn no_bid(&self, desc: &'static str) -> Error {
        let _ = self.res.set(BidResponseState::no_bid(desc));

        anyhow!(desc)
    }
}
