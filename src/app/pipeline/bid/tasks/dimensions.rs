use crate::app::pipeline::bid::BidContext;
use crate::child_span_debug;
use crate::core::pipeline::BlockingTask;
use crate::core::snapshot::model::Dimensions;
use anyhow::{Error, anyhow};
use tracing::trace;

/// Resolves the raw request names to code table ids of the
/// request's snapshot, unknown names resolve to zero
pub struct ResolveDimensionsTask;

impl BlockingTask<BidContext, Error> for ResolveDimensionsTask {
    fn run(&self, context: &BidContext) -> Result<(), Error> {
        let _span = child_span_debug!("resolve_dimensions_task").entered();

        let lookups = context.snapshot.lookups();
        let req = &context.req;

        let dims = Dimensions {
            country: lookups.countries.resolve(&req.device.geo.country),
            brand: lookups.brand_slugs.resolve(&req.site.brand),
            network: lookups.networks.resolve(&req.site.network),
            network_type: lookups.network_types.resolve(&req.site.networktype),
            sub_network: lookups.sub_networks.resolve(&req.site.subnetwork),
            gender: lookups.genders.resolve(&req.user.gender),
            device_type: lookups.device_types.resolve(&req.device.devicetype),
            vertical: lookups.verticals.resolve(&req.site.vertical),
        };

        trace!("Resolved request dimensions {:?}", dims);

        context
            .dims
            .set(dims)
            .map_err(|_| anyhow!("Dimensions already resolved on context"))
    }
}
