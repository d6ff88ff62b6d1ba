//! Wallet model: one user's balance of one currency

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Quantity;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// A user's balance of one currency.
///
/// Keyed by (user, currency); at most one wallet exists per pair. Created
/// lazily on first buy, updated on every settlement, never deleted. The
/// balance is non-negative at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Wallet {
    /// Owning user
    pub user_id: Uuid,
    /// Held currency
    pub currency_id: Uuid,
    /// Current balance (8 decimal places)
    pub balance: Quantity,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new empty wallet
    pub fn new(user_id: Uuid, currency_id: Uuid) -> Self {
        Self {
            user_id,
            currency_id,
            balance: Quantity::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Add bought units to the balance
    pub fn credit(&mut self, quantity: Quantity) {
        self.balance += quantity;
        self.updated_at = Utc::now();
    }

    /// Remove sold units from the balance; refuses to overdraw
    pub fn debit(&mut self, quantity: Quantity) -> Result<(), String> {
        if quantity > self.balance {
            return Err(format!(
                "insufficient balance: {} available, {} requested",
                self.balance, quantity
            ));
        }

        self.balance -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }
}
