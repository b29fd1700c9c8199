pub mod bidding;
pub mod config_manager;
pub mod events;
pub mod ledger;
pub mod models;
#[macro_use]
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod recall;
pub mod reconciler;
pub mod snapshot;
