use crate::core::providers::SnapshotLoader;
use crate::core::snapshot::model::ConfigSnapshot;
use anyhow::{Context, Error};
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

type PublishCallback = Box<dyn Fn(&ConfigSnapshot) + Send + Sync>;

/// Owns the live [`ConfigSnapshot`] behind a single atomically
/// replaced pointer. Readers take one reference per request and keep
/// it for the whole request, a concurrent publish never changes what
/// they see.
pub struct RuntimePublisher {
    current: ArcSwap<ConfigSnapshot>,
    loader: Arc<dyn SnapshotLoader>,
    next_version: AtomicU64,
    callbacks: RwLock<Vec<PublishCallback>>,
    stop: Notify,
}

impl RuntimePublisher {
    /// Builds and publishes the first snapshot, failing if it
    /// cannot be loaded
    pub async fn start(loader: Arc<dyn SnapshotLoader>) -> Result<Arc<Self>, Error> {
        let first = build_snapshot(loader.as_ref(), 1)
            .await
            .context("Initial snapshot load failed")?;

        info!(
            "Published initial snapshot v1 with {} folders",
            first.folders().len()
        );

        Ok(Arc::new(RuntimePublisher {
            current: ArcSwap::from_pointee(first),
            loader,
            next_version: AtomicU64::new(2),
            callbacks: RwLock::new(Vec::new()),
            stop: Notify::new(),
        }))
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn on_publish(&self, cb: PublishCallback) {
        self.callbacks.write().push(cb);
    }

    /// Loads and publishes a fresh snapshot, returning its version.
    /// On failure the current snapshot stays in place.
    pub async fn refresh(&self) -> Result<u64, Error> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(build_snapshot(self.loader.as_ref(), version).await?);

        self.current.store(snapshot.clone());

        for cb in self.callbacks.read().iter() {
            cb(snapshot.as_ref());
        }

        Ok(version)
    }

    /// Refreshes on a fixed interval until [`RuntimePublisher::stop`]
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) {
        let publisher = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        match publisher.refresh().await {
                            Ok(version) => debug!("Published snapshot v{}", version),
                            Err(e) => warn!(
                                "Snapshot refresh failed, keeping v{}: {:#}",
                                publisher.snapshot().version(),
                                e
                            ),
                        }
                    }
                    _ = publisher.stop.notified() => break,
                }
            }

            info!("Snapshot refresh stopped");
        });
    }

    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

async fn build_snapshot(loader: &dyn SnapshotLoader, version: u64) -> Result<ConfigSnapshot, Error> {
    let source = loader.load().await?;

    ConfigSnapshot::build(source, version)
        .with_context(|| format!("Snapshot v{} failed validation", version))
}
