//! Market price observations and the price-feed seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Price;
use crate::error::Result;
use crate::model::currency::Cryptocurrency;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// A timestamped price observation for one currency.
///
/// Rows are append-only; the "current" price of a currency is the row with
/// the maximum `recorded_at`, derived at query time and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct MarketPrice {
    /// Unique observation ID
    pub id: Uuid,
    /// Currency this observation belongs to
    pub currency_id: Uuid,
    /// Observed unit price (2 decimal places)
    pub price: Price,
    /// Observation timestamp
    pub recorded_at: DateTime<Utc>,
}

impl MarketPrice {
    /// Create a new observation stamped with the current time
    pub fn new(currency_id: Uuid, price: Price) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency_id,
            price,
            recorded_at: Utc::now(),
        }
    }
}

/// Read seam between the market-price domain and the services that consume
/// it. Settlement and valuation declare a hard dependency on this trait
/// rather than reaching into the pricing service directly.
///
/// `latest_price` reports an empty market as `None`; callers decide whether
/// that means "use a fallback" or "refuse to trade".
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Look up a currency by ID
    async fn currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>>;

    /// The most recent price observation for a currency, if any exists
    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>>;
}
