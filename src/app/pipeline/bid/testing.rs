use crate::app::config::{BiddingConfig, EventConfigBuilder};
use crate::app::pipeline::bid::{BidContext, BidPipelineDeps, build_bid_pipeline};
use crate::core::bidding::strategy::{BiddingStrategy, UniformStrategy};
use crate::core::models::ortb::{BidRequest, Imp};
use crate::core::pipeline::Pipeline;
use crate::core::recall::allocator::RecallAllocator;
use crate::core::recall::codec::RecallCodec;
use crate::core::recall::local_store::LocalRecallStore;
use crate::core::recall::store::{RecallError, RecallStore};
use crate::core::snapshot::model::{
    CodeEntry, ConfigSnapshot, Creative, Dimensions, Folder, SnapshotSource,
};
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

fn entry(id: u32, name: &str) -> CodeEntry {
    CodeEntry {
        id,
        name: name.to_string(),
    }
}

/// One root folder on network `net-a` with a cpc of 100 and a
/// single creative
pub fn source() -> SnapshotSource {
    SnapshotSource {
        folders: vec![Folder {
            id: 1,
            parent: None,
            children: vec![],
            creatives: vec![10],
            cpc: 100,
            budget: 0,
            owner: 1,
            active: true,
            targeting: Dimensions {
                network: 3,
                ..Default::default()
            },
        }],
        creatives: vec![Creative {
            id: 10,
            redirect_url: "https://lp.example.com/go?c={clickid}&n={network}&cpc={cpc}&a={auctionid}"
                .to_string(),
        }],
        countries: vec![entry(1, "US")],
        networks: vec![entry(3, "net-a"), entry(4, "net-b")],
        ..Default::default()
    }
}

pub fn request(test: bool) -> BidRequest {
    let mut req = BidRequest {
        imp: vec![Imp {
            id: "1".into(),
            bidfloor: 40,
            ..Default::default()
        }],
        rand: 7,
        test,
        ..Default::default()
    };
    req.site.network = "net-a".into();
    req.device.geo.country = "US".into();

    req
}

struct UnavailableStore;

#[async_trait]
impl RecallStore for UnavailableStore {
    async fn store(&self, _key: &str, _value: String) -> Result<(), RecallError> {
        Err(RecallError::Backend(anyhow!("connection refused")))
    }

    async fn load(&self, key: &str) -> Result<String, RecallError> {
        Err(RecallError::Miss(key.to_string()))
    }
}

pub struct Fixture {
    pub pipeline: Pipeline<BidContext, Error>,
    pub recalls: Arc<dyn RecallStore>,
    pub codec: Arc<RecallCodec>,
    snapshot: Arc<ConfigSnapshot>,
}

impl Fixture {
    pub fn new(bidding: BiddingConfig) -> Self {
        let strategy = Arc::new(UniformStrategy::new(bidding.revenue_share));
        Self::build(bidding, strategy, Arc::new(LocalRecallStore::new(Duration::from_secs(60), 1000)))
    }

    pub fn with_strategy(bidding: BiddingConfig, strategy: Arc<dyn BiddingStrategy>) -> Self {
        Self::build(bidding, strategy, Arc::new(LocalRecallStore::new(Duration::from_secs(60), 1000)))
    }

    pub fn failing_recalls(bidding: BiddingConfig) -> Self {
        let strategy = Arc::new(UniformStrategy::new(bidding.revenue_share));
        Self::build(bidding, strategy, Arc::new(UnavailableStore))
    }

    fn build(
        bidding: BiddingConfig,
        strategy: Arc<dyn BiddingStrategy>,
        recalls: Arc<dyn RecallStore>,
    ) -> Self {
        let codec = Arc::new(RecallCodec::new(b"hello", b"whatwhat").unwrap());
        let events = EventConfigBuilder::default()
            .domain("bids.example.com".to_string())
            .build()
            .unwrap();

        let pipeline = build_bid_pipeline(
            BidPipelineDeps {
                strategy,
                allocator: Arc::new(RecallAllocator::new(recalls.clone(), 5)),
                codec: codec.clone(),
            },
            &bidding,
            &events,
            0.0,
        )
        .unwrap();

        Fixture {
            pipeline,
            recalls,
            codec,
            snapshot: Arc::new(ConfigSnapshot::build(source(), 1).unwrap()),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot.clone()
    }
}
