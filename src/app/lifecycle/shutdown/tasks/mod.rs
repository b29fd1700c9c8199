pub mod observability;
pub mod stop_refresh;
pub mod stop_server;
