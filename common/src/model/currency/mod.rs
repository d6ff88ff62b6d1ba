//! Tradable cryptocurrency model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// A tradable cryptocurrency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Cryptocurrency {
    /// Unique currency ID
    pub id: Uuid,
    /// Full name (e.g., "Bitcoin")
    pub name: String,
    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,
    /// Blockchain family (e.g., "UTXO", "EVM")
    pub blockchain: Option<String>,
    /// Date the asset launched
    pub launch_date: Option<NaiveDate>,
}

impl Cryptocurrency {
    /// Create a new currency record with a freshly generated ID
    pub fn new(
        name: String,
        symbol: String,
        blockchain: Option<String>,
        launch_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            symbol,
            blockchain,
            launch_date,
        }
    }
}
