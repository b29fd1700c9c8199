use crate::core::recall::model::RecallRecord;
use crate::core::snapshot::model::{CreativeId, FolderId};
use serde::Serialize;

/// One settled win. Column order matches the purchases table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseRow {
    pub sale_id: i64,
    pub billable: bool,
    pub rev_tx: i64,
    pub rev_tx_home: i64,
    pub rev_ssp: i64,
    pub rev_ssp_home: i64,
    pub ssp_id: i64,
    pub folder_id: FolderId,
    pub creative_id: CreativeId,
    pub country_id: u32,
    pub vertical_id: u32,
    pub brand_id: u32,
    pub network_id: u32,
    pub subnetwork_id: u32,
    pub networktype_id: u32,
    pub gender_id: u32,
    pub devicetype_id: u32,
}

impl PurchaseRow {
    /// Revenue to home is the paid price plus the margin kept at bid time.
    /// Returns `None` when that sum overflows.
    pub fn settle(sale_id: i64, paid: i64, record: &RecallRecord) -> Option<Self> {
        let revenue = paid.checked_add(record.margin)?;
        let dims = &record.dims;

        Some(PurchaseRow {
            sale_id,
            billable: !record.test,
            rev_tx: revenue,
            rev_tx_home: revenue,
            rev_ssp: paid,
            rev_ssp_home: paid,
            ssp_id: 0,
            folder_id: record.folder,
            creative_id: record.creative,
            country_id: dims.country,
            vertical_id: dims.vertical,
            brand_id: dims.brand,
            network_id: dims.network,
            subnetwork_id: dims.sub_network,
            networktype_id: dims.network_type,
            gender_id: dims.gender,
            devicetype_id: dims.device_type,
        })
    }
}
