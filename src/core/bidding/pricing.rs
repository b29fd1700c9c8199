/// Upper bound on the share of the full price bid out
pub const MAX_REVENUE_SHARE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub full_price: i64,
    pub revenue_share: f64,
    pub bid_price: f64,
    /// What the platform keeps, full price minus the truncated bid
    pub margin: i64,
}

/// Clamps a strategy supplied share into [0, 100]. Non finite
/// values bid nothing.
pub fn clamp_revenue_share(share: f64) -> f64 {
    if !share.is_finite() {
        return 0.0;
    }

    share.clamp(0.0, MAX_REVENUE_SHARE)
}

/// Discount the full folder price by the revenue share percent
///
/// # Example
/// A full price of 350 at a 98% share bids 343.0 and keeps 7
pub fn price_bid(full_price: i64, revenue_share: f64) -> Pricing {
    let revenue_share = clamp_revenue_share(revenue_share);
    let bid_price = full_price as f64 * revenue_share / 100.0;

    Pricing {
        full_price,
        revenue_share,
        bid_price,
        margin: full_price - bid_price.trunc() as i64,
    }
}
