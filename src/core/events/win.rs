use serde::{Deserialize, Serialize};

/// An exchange confirmation that a bid won. Fields stay raw strings,
/// they are only parsed when the notice is reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinNotice {
    /// Numeric recall id or click token
    pub key: String,
    /// Clearing price paid
    #[serde(default)]
    pub price: String,
    /// Exchange sale id
    #[serde(default)]
    pub imp: String,
}

impl WinNotice {
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty()
    }
}
