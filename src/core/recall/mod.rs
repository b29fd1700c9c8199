pub mod allocator;
pub mod codec;
pub mod local_store;
pub mod model;
pub mod redis_store;
pub mod shard;
pub mod store;
pub mod swappable;
