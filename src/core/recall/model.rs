use crate::core::snapshot::model::{CreativeId, Dimensions, FolderId};
use serde::{Deserialize, Serialize};

/// Everything needed to settle a win, captured at bid time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallRecord {
    pub folder: FolderId,
    pub creative: CreativeId,
    /// Undiscounted folder price in micro units
    pub full_price: i64,
    pub margin: i64,
    pub dims: Dimensions,
    #[serde(default)]
    pub test: bool,
}

impl RecallRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
