//! Watchlist model: bookmarked currencies, no financial effect

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// One bookmarked currency for one user; at most one entry per pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct WatchlistEntry {
    /// Unique entry ID
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Bookmarked currency
    pub currency_id: Uuid,
    /// When the bookmark was added
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    /// Create a new entry stamped with the current time
    pub fn new(user_id: Uuid, currency_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            currency_id,
            added_at: Utc::now(),
        }
    }
}
