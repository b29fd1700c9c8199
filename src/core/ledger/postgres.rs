use crate::core::ledger::ledger::PurchaseLedger;
use crate::core::ledger::model::PurchaseRow;
use anyhow::{Context, Error};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;

const CREATE_PURCHASES: &str = "CREATE TABLE IF NOT EXISTS purchases (
    id BIGSERIAL PRIMARY KEY,
    sale_id BIGINT NOT NULL,
    billable BOOLEAN NOT NULL,
    rev_tx BIGINT NOT NULL,
    rev_tx_home BIGINT NOT NULL,
    rev_ssp BIGINT NOT NULL,
    rev_ssp_home BIGINT NOT NULL,
    ssp_id BIGINT NOT NULL,
    folder_id BIGINT NOT NULL,
    creative_id BIGINT NOT NULL,
    country_id BIGINT NOT NULL,
    vertical_id BIGINT NOT NULL,
    brand_id BIGINT NOT NULL,
    network_id BIGINT NOT NULL,
    subnetwork_id BIGINT NOT NULL,
    networktype_id BIGINT NOT NULL,
    gender_id BIGINT NOT NULL,
    devicetype_id BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const INSERT_PURCHASES: &str = "INSERT INTO purchases (sale_id, billable, rev_tx, rev_tx_home, \
    rev_ssp, rev_ssp_home, ssp_id, folder_id, creative_id, country_id, vertical_id, brand_id, \
    network_id, subnetwork_id, networktype_id, gender_id, devicetype_id) ";

/// Appends purchases to a postgres `purchases` table, one multi row
/// insert per batch. A failed insert drops the whole batch.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .context("Failed connecting to purchase ledger")?;

        sqlx::query(CREATE_PURCHASES)
            .execute(&pool)
            .await
            .context("Failed creating purchases table")?;

        info!("Purchase ledger connected, pool size {}", max_connections);

        Ok(PostgresLedger { pool })
    }
}

#[async_trait]
impl PurchaseLedger for PostgresLedger {
    async fn record(&self, rows: &[PurchaseRow]) -> Result<u64, Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_PURCHASES);
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.sale_id)
                .push_bind(row.billable)
                .push_bind(row.rev_tx)
                .push_bind(row.rev_tx_home)
                .push_bind(row.rev_ssp)
                .push_bind(row.rev_ssp_home)
                .push_bind(row.ssp_id)
                .push_bind(i64::from(row.folder_id))
                .push_bind(i64::from(row.creative_id))
                .push_bind(i64::from(row.country_id))
                .push_bind(i64::from(row.vertical_id))
                .push_bind(i64::from(row.brand_id))
                .push_bind(i64::from(row.network_id))
                .push_bind(i64::from(row.subnetwork_id))
                .push_bind(i64::from(row.networktype_id))
                .push_bind(i64::from(row.gender_id))
                .push_bind(i64::from(row.devicetype_id));
        });

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed inserting {} purchases", rows.len()))?;

        Ok(result.rows_affected())
    }
}
