mod file_snapshot;
mod snapshot_loader;

pub use file_snapshot::FileSnapshotLoader;
pub use snapshot_loader::*;
