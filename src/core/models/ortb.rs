use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Inbound auction request. Only the fields the bidder reads are
/// modelled, unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BidRequest {
    pub imp: Vec<Imp>,
    pub site: Site,
    pub device: Device,
    pub user: User,
    /// Exchange supplied random value in [0, 255)
    pub rand: u32,
    /// Test traffic, never billable
    pub test: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Imp {
    pub id: String,
    /// Minimum acceptable price in micro units
    pub bidfloor: i64,
    pub redirect: Redirect,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Redirect {
    pub battr: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub vertical: String,
    pub brand: String,
    pub network: String,
    pub subnetwork: String,
    pub networktype: String,
    pub placement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub devicetype: String,
    pub ua: String,
    pub geo: Geo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Geo {
    pub country: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub gender: String,
    pub remoteaddr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct Bid {
    /// Decimal recall id
    pub id: String,
    pub price: f64,
    /// Click redirect
    pub rurl: String,
    /// Win notice url template
    pub nurl: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct SeatBid {
    pub bid: Vec<Bid>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct BidResponse {
    pub seatbid: Vec<SeatBid>,
}

/// Terminal state of a bid request
#[derive(Debug, Clone, PartialEq)]
pub enum BidResponseState {
    Bid(BidResponse),
    NoBid { desc: Option<&'static str> },
}

impl BidResponseState {
    pub fn no_bid(desc: &'static str) -> Self {
        BidResponseState::NoBid { desc: Some(desc) }
    }
}
