use crate::app::pipeline::bid::BidContext;
use crate::child_span_info;
use crate::core::bidding::macros::{ClickMacros, fill_click_macros};
use crate::core::bidding::strategy::BiddingStrategy;
use crate::core::models::ortb::{
    BidBuilder, BidResponseBuilder, BidResponseState, SeatBidBuilder,
};
use crate::core::pipeline::BlockingTask;
use crate::core::recall::codec::RecallCodec;
use anyhow::{Error, anyhow};
use std::sync::Arc;

/// Mints the click token, expands the creative redirect and assembles
/// the single bid response
pub struct BuildBidTask {
    codec: Arc<RecallCodec>,
    strategy: Arc<dyn BiddingStrategy>,
    /// Win notice url template
    nurl: String,
}

impl BuildBidTask {
    pub fn new(codec: Arc<RecallCodec>, strategy: Arc<dyn BiddingStrategy>, nurl: String) -> Self {
        Self {
            codec,
            strategy,
            nurl,
        }
    }
}

impl BlockingTask<BidContext, Error> for BuildBidTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let _span = child_span_info!("build_bid_task").entered();

        let (Some(selection), Some(pricing), Some(dims), Some(recall_id)) = (
            context.selection.get(),
            context.pricing.get(),
            context.dims.get(),
            context.recall_id.get(),
        ) else {
            return Err(anyhow!("Bid context incomplete before building response"));
        };

        let creative = context
            .snapshot
            .creative(selection.creative)
            .ok_or_else(|| anyhow!("Creative {} missing from snapshot", selection.creative))?;

        let lookups = context.snapshot.lookups();
        let click_id = self.codec.encode_recall_id(*recall_id);
        let tracking_token = self.strategy.tracking_token(&context.req, selection);

        let macros = ClickMacros {
            click_id: &click_id,
            tracking_token: &tracking_token,
            auction_id: *recall_id,
            network: lookups.networks.name(dims.network).unwrap_or_default(),
            sub_network: lookups.sub_networks.name(dims.sub_network).unwrap_or_default(),
            brand: lookups.brands.name(dims.brand).unwrap_or_default(),
            brand_slug: lookups.brand_slugs.name(dims.brand).unwrap_or_default(),
            vertical: lookups.verticals.name(dims.vertical).unwrap_or_default(),
            placement: &context.req.site.placement,
            full_price: pricing.full_price,
        };

        let bid = BidBuilder::default()
            .id(recall_id.to_string())
            .price(pricing.bid_price)
            .rurl(fill_click_macros(&creative.redirect_url, &macros))
            .nurl(self.nurl.clone())
            .build()?;

        let seat = SeatBidBuilder::default().bid(vec![bid]).build()?;
        let res = BidResponseBuilder::default().seatbid(vec![seat]).build()?;

        context
            .res
            .set(BidResponseState::Bid(res))
            .map_err(|_| anyhow!("Response state already assigned on context"))
    }
}
