use crate::core::events::WinNotice;
use crate::core::ledger::{PurchaseLedger, PurchaseRow};
use crate::core::recall::codec::RecallCodec;
use crate::core::recall::model::RecallRecord;
use crate::core::recall::store::RecallStore;
use crate::core::reconciler::batcher::next_batch;
use anyhow::{Context, Error, anyhow};
use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

static WIN_NOTICES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    global::meter("rdsp")
        .u64_counter("win_notices")
        .with_description("Win notices by reconciliation outcome")
        .with_unit("1")
        .build()
});

/// The collaborators a batch resolves against, swapped as a unit
#[derive(Clone)]
pub struct ReconcilerDeps {
    pub recalls: Arc<dyn RecallStore>,
    pub ledger: Arc<dyn PurchaseLedger>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    pub resolved: usize,
    pub written: u64,
}

/// Micro-batches win notices, settles each against its recall record
/// and hands the resulting purchases to the ledger in one call per
/// batch
pub struct WinReconciler {
    deps: RwLock<ReconcilerDeps>,
    codec: Arc<RecallCodec>,
    max_batch: usize,
    batch_timeout: Duration,
}

impl WinReconciler {
    pub fn new(deps: ReconcilerDeps, codec: Arc<RecallCodec>, max_batch: usize, batch_timeout: Duration) -> Self {
        WinReconciler {
            deps: RwLock::new(deps),
            codec,
            max_batch,
            batch_timeout,
        }
    }

    /// Replace the live collaborators, batches already running keep
    /// the ones they started with
    pub fn reconfigure(&self, deps: ReconcilerDeps) {
        *self.deps.write() = deps;
        info!("Win reconciler dependencies replaced");
    }

    fn live_deps(&self) -> ReconcilerDeps {
        self.deps.read().clone()
    }

    /// Spawns the batching loop and returns the queue feeding it. The
    /// loop ends once every sender is dropped.
    pub fn start(self: &Arc<Self>, queue_depth: usize) -> mpsc::Sender<WinNotice> {
        let (tx, mut rx) = mpsc::channel(queue_depth);
        let reconciler = self.clone();

        tokio::spawn(async move {
            while let Some(batch) = next_batch(&mut rx, reconciler.max_batch, reconciler.batch_timeout).await {
                let worker = reconciler.clone();
                tokio::spawn(async move {
                    worker.process_batch(batch).await;
                });
            }

            info!("Win queue closed, reconciler stopped");
        });

        tx
    }

    /// Settles a batch in arrival order. Notices that fail to parse or
    /// resolve are skipped without affecting the rest of the batch.
    pub async fn process_batch(&self, batch: Vec<WinNotice>) -> BatchSummary {
        let started = Instant::now();
        let deps = self.live_deps();

        let mut rows = Vec::with_capacity(batch.len());
        for notice in &batch {
            match self.settle(&deps, notice).await {
                Ok(row) => rows.push(row),
                Err(e) => {
                    WIN_NOTICES.add(1, &[KeyValue::new("outcome", "skipped")]);
                    debug!("Skipping win notice for key {}: {:#}", notice.key, e);
                }
            }
        }

        let written = if rows.is_empty() {
            0
        } else {
            match deps.ledger.record(&rows).await {
                Ok(written) => {
                    WIN_NOTICES.add(rows.len() as u64, &[KeyValue::new("outcome", "recorded")]);
                    written
                }
                Err(e) => {
                    WIN_NOTICES.add(rows.len() as u64, &[KeyValue::new("outcome", "ledger_failed")]);
                    error!("Failed recording {} purchases: {:#}", rows.len(), e);
                    0
                }
            }
        };

        let summary = BatchSummary {
            received: batch.len(),
            resolved: rows.len(),
            written,
        };

        info!(
            "Reconciled win batch: {} received, {} resolved, {} written in {:?}",
            summary.received,
            summary.resolved,
            summary.written,
            started.elapsed()
        );

        summary
    }

    async fn settle(&self, deps: &ReconcilerDeps, notice: &WinNotice) -> Result<PurchaseRow, Error> {
        let paid: i64 = notice
            .price
            .trim()
            .parse()
            .with_context(|| format!("malformed price '{}'", notice.price))?;
        let sale_id: i64 = notice
            .imp
            .trim()
            .parse()
            .with_context(|| format!("malformed sale id '{}'", notice.imp))?;

        let recall_id = self
            .recall_id(&notice.key)
            .ok_or_else(|| anyhow!("undecodable recall key"))?;

        let raw = deps.recalls.load(&recall_id.to_string()).await?;
        let record = RecallRecord::from_json(&raw).context("corrupt recall record")?;

        if record.margin < 0 {
            warn!("Recall {} carries negative margin {}", recall_id, record.margin);
        }

        PurchaseRow::settle(sale_id, paid, &record)
            .ok_or_else(|| anyhow!("price {} overflows with margin {}", paid, record.margin))
    }

    /// Keys arrive either as the bare bid id or as the click token
    fn recall_id(&self, key: &str) -> Option<u64> {
        key.parse()
            .ok()
            .or_else(|| self.codec.decode_recall_id(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::MemoryLedger;
    use crate::core::recall::local_store::LocalRecallStore;
    use crate::core::snapshot::model::Dimensions;
    use async_trait::async_trait;

    fn record(margin: i64) -> RecallRecord {
        RecallRecord {
            folder: 1,
            creative: 10,
            full_price: 100,
            margin,
            dims: Dimensions::default(),
            test: false,
        }
    }

    fn notice(key: &str, price: &str, imp: &str) -> WinNotice {
        WinNotice {
            key: key.into(),
            price: price.into(),
            imp: imp.into(),
        }
    }

    struct Fixture {
        recalls: Arc<LocalRecallStore>,
        ledger: Arc<MemoryLedger>,
        codec: Arc<RecallCodec>,
        reconciler: Arc<WinReconciler>,
    }

    fn fixture(max_batch: usize, batch_timeout: Duration) -> Fixture {
        let recalls = Arc::new(LocalRecallStore::new(Duration::from_secs(600), 1000));
        let ledger = Arc::new(MemoryLedger::default());
        let codec = Arc::new(RecallCodec::new(b"hello", b"whatwhat").unwrap());

        let reconciler = Arc::new(WinReconciler::new(
            ReconcilerDeps {
                recalls: recalls.clone(),
                ledger: ledger.clone(),
            },
            codec.clone(),
            max_batch,
            batch_timeout,
        ));

        Fixture {
            recalls,
            ledger,
            codec,
            reconciler,
        }
    }

    #[tokio::test]
    async fn test_missing_recall_is_skipped() {
        let f = fixture(100, Duration::from_secs(10));
        f.recalls.store("1", record(2).to_json().unwrap()).await.unwrap();
        f.recalls.store("3", record(5).to_json().unwrap()).await.unwrap();

        let summary = f
            .reconciler
            .process_batch(vec![
                notice("1", "90", "500"),
                notice("2", "90", "501"),
                notice("3", "40", "502"),
            ])
            .await;

        assert_eq!(
            summary,
            BatchSummary {
                received: 3,
                resolved: 2,
                written: 2
            }
        );

        let rows = f.ledger.rows();
        assert_eq!(rows[0].sale_id, 500);
        assert_eq!(rows[0].rev_tx, 92);
        assert_eq!(rows[1].sale_id, 502);
        assert_eq!(rows[1].rev_tx, 45);
    }

    #[tokio::test]
    async fn test_malformed_fields_are_skipped() {
        let f = fixture(100, Duration::from_secs(10));
        f.recalls.store("1", record(2).to_json().unwrap()).await.unwrap();
        f.recalls.store("4", "{not json".into()).await.unwrap();

        let summary = f
            .reconciler
            .process_batch(vec![
                notice("1", "ninety", "500"),
                notice("1", "90", ""),
                notice("4", "90", "501"),
                notice("not-a-token", "90", "502"),
            ])
            .await;

        assert_eq!(summary.resolved, 0);
        assert_eq!(summary.written, 0);
        assert!(f.ledger.rows().is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_price_skips_only_that_notice() {
        let f = fixture(100, Duration::from_secs(10));
        f.recalls.store("1", record(2).to_json().unwrap()).await.unwrap();
        f.recalls.store("2", record(2).to_json().unwrap()).await.unwrap();

        let reconciler = f.reconciler.clone();
        let summary = tokio::spawn(async move {
            reconciler
                .process_batch(vec![
                    notice("1", "90", "500"),
                    notice("2", &i64::MAX.to_string(), "501"),
                ])
                .await
        })
        .await
        .unwrap();

        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.written, 1);

        let rows = f.ledger.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sale_id, 500);
        assert_eq!(rows[0].rev_tx, 92);
    }

    #[tokio::test]
    async fn test_click_token_keys_resolve() {
        let f = fixture(100, Duration::from_secs(10));
        f.recalls.store("7781", record(3).to_json().unwrap()).await.unwrap();

        let token = f.codec.encode_recall_id(7781);
        let summary = f.reconciler.process_batch(vec![notice(&token, "10", "1")]).await;

        assert_eq!(summary.resolved, 1);
        assert_eq!(f.ledger.rows()[0].rev_tx, 13);
    }

    struct FailingLedger;

    #[async_trait]
    impl PurchaseLedger for FailingLedger {
        async fn record(&self, _rows: &[PurchaseRow]) -> Result<u64, Error> {
            Err(anyhow!("ledger offline"))
        }
    }

    #[tokio::test]
    async fn test_reconfigure_swaps_ledger() {
        let f = fixture(100, Duration::from_secs(10));
        f.recalls.store("1", record(2).to_json().unwrap()).await.unwrap();

        f.reconciler.reconfigure(ReconcilerDeps {
            recalls: f.recalls.clone(),
            ledger: Arc::new(FailingLedger),
        });

        let summary = f.reconciler.process_batch(vec![notice("1", "90", "5")]).await;

        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.written, 0);
        assert!(f.ledger.rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_flushes_partial_batch_after_timeout() {
        let f = fixture(100, Duration::from_secs(10));
        for id in 1..=3 {
            f.recalls
                .store(&id.to_string(), record(2).to_json().unwrap())
                .await
                .unwrap();
        }

        let tx = f.reconciler.start(16);
        for id in 1..=3 {
            tx.send(notice(&id.to_string(), "90", &id.to_string()))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(f.ledger.rows().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let rows = f.ledger.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.sale_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
