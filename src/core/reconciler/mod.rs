pub mod batcher;
#[allow(clippy::module_inception)]
pub mod reconciler;

pub use reconciler::{ReconcilerDeps, WinReconciler};
