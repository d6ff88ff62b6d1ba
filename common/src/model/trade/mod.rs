//! Order and transaction models: the append-only trade audit trail

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Amount, Price, Quantity};
use crate::error::Error;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Trade side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(Error::Internal(format!("unknown order side: {}", other))),
        }
    }
}

/// Order status
///
/// Orders settle immediately at the quoted price, so every persisted order
/// is complete; the status column keeps the audit trail explicit and leaves
/// room for lifecycle states without a schema break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum OrderStatus {
    Completed,
}

impl OrderStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(Error::Internal(format!("unknown order status: {}", other))),
        }
    }
}

/// Transaction kind, mirrors the side of the order it settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TransactionKind::Buy),
            "SELL" => Ok(TransactionKind::Sell),
            other => Err(Error::Internal(format!(
                "unknown transaction kind: {}",
                other
            ))),
        }
    }
}

impl From<Side> for TransactionKind {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => TransactionKind::Buy,
            Side::Sell => TransactionKind::Sell,
        }
    }
}

/// A record of an intent to trade, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    /// User who placed the order
    pub user_id: Uuid,
    /// Traded currency
    pub currency_id: Uuid,
    /// Buy or sell
    pub side: Side,
    /// Traded quantity (at most 2 decimal places)
    pub quantity: Quantity,
    /// Unit price at execution time
    pub unit_price: Price,
    /// Order status
    pub status: OrderStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a completed order stamped with the current time
    pub fn new(
        user_id: Uuid,
        currency_id: Uuid,
        side: Side,
        quantity: Quantity,
        unit_price: Price,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            currency_id,
            side,
            quantity,
            unit_price,
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

/// A record of settled value movement, 1:1 with its order and immutable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Transaction {
    /// Unique transaction ID
    pub id: Uuid,
    /// Order this transaction settles
    pub order_id: Uuid,
    /// User the value moved for
    pub user_id: Uuid,
    /// Monetary amount: quantity x unit price, rounded to 2 decimal places
    pub amount: Amount,
    /// Mirrors the order side
    pub kind: TransactionKind,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create the settlement transaction for an order
    pub fn new(order: &Order, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: order.user_id,
            amount,
            kind: order.side.into(),
            created_at: Utc::now(),
        }
    }
}
