pub mod bid_pipeline;
pub mod config_load;
pub mod dependency_refresh;
pub mod ledger;
pub mod observability;
pub mod recall_cache;
pub mod snapshot_publisher;
pub mod start_server;
pub mod win_reconciler;
