use crate::app::pipeline::bid::BidContext;
use crate::core::models::ortb::{BidRequest, BidResponse, BidResponseState};
use crate::core::pipeline::Pipeline;
use crate::core::snapshot::model::ConfigSnapshot;
use anyhow::{Error, anyhow};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// What the HTTP layer answers with
#[derive(Debug)]
pub enum BidOutcome {
    Bid(BidResponse),
    NoBid(Option<&'static str>),
    Failed(Error),
}

/// Runs one auction request through the bid pipeline against the
/// given snapshot. A panic in any task is contained here and
/// reported as a failure of this request only.
pub async fn decide(
    pipeline: &Pipeline<BidContext, Error>,
    snapshot: Arc<ConfigSnapshot>,
    req: BidRequest,
) -> BidOutcome {
    let ctx = BidContext::new(req, snapshot);

    let result = match AssertUnwindSafe(pipeline.run(&ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(
                "Bid pipeline panicked, failing request (network '{}', country '{}', {} imps): {}",
                ctx.req.site.network,
                ctx.req.device.geo.country,
                ctx.req.imp.len(),
                msg
            );
            return BidOutcome::Failed(anyhow!("Bid pipeline panicked: {}", msg));
        }
    };

    match (ctx.res.into_inner(), result) {
        (Some(BidResponseState::Bid(res)), _) => BidOutcome::Bid(res),
        (Some(BidResponseState::NoBid { desc }), _) => {
            debug!("No bid: {}", desc.unwrap_or("none"));
            BidOutcome::NoBid(desc)
        }
        (None, Err(e)) => {
            error!("Bid pipeline failed: {:#}", e);
            BidOutcome::Failed(e)
        }
        (None, Ok(())) => BidOutcome::NoBid(None),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
