//! Database row models shared by the PostgreSQL repositories
//!
//! Each row struct mirrors one table and converts into its domain model.
//! Enum-bearing rows use `TryFrom` because the stored string may be
//! corrupt; the rest convert infallibly.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Error;
use crate::model::currency::Cryptocurrency;
use crate::model::price::MarketPrice;
use crate::model::trade::{Order, OrderStatus, Side, Transaction, TransactionKind};
use crate::model::user::{AdminUser, User};
use crate::model::wallet::Wallet;
use crate::model::watchlist::WatchlistEntry;

/// Row model for the users table
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Row model for the admin_users table
#[derive(Debug, Clone, FromRow)]
pub struct DbAdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbAdminUser> for AdminUser {
    fn from(row: DbAdminUser) -> Self {
        AdminUser {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Row model for the currencies table
#[derive(Debug, Clone, FromRow)]
pub struct DbCurrency {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
    pub blockchain: Option<String>,
    pub launch_date: Option<NaiveDate>,
}

impl From<DbCurrency> for Cryptocurrency {
    fn from(row: DbCurrency) -> Self {
        Cryptocurrency {
            id: row.id,
            name: row.name,
            symbol: row.symbol,
            blockchain: row.blockchain,
            launch_date: row.launch_date,
        }
    }
}

/// Row model for the market_prices table
#[derive(Debug, Clone, FromRow)]
pub struct DbMarketPrice {
    pub id: Uuid,
    pub currency_id: Uuid,
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl From<DbMarketPrice> for MarketPrice {
    fn from(row: DbMarketPrice) -> Self {
        MarketPrice {
            id: row.id,
            currency_id: row.currency_id,
            price: row.price,
            recorded_at: row.recorded_at,
        }
    }
}

/// Row model for the wallets table
#[derive(Debug, Clone, FromRow)]
pub struct DbWallet {
    pub user_id: Uuid,
    pub currency_id: Uuid,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<DbWallet> for Wallet {
    fn from(row: DbWallet) -> Self {
        Wallet {
            user_id: row.user_id,
            currency_id: row.currency_id,
            balance: row.balance,
            updated_at: row.updated_at,
        }
    }
}

/// Row model for the orders table
#[derive(Debug, Clone, FromRow)]
pub struct DbOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency_id: Uuid,
    pub side: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbOrder> for Order {
    type Error = Error;

    fn try_from(row: DbOrder) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            currency_id: row.currency_id,
            side: Side::from_str(&row.side)?,
            quantity: row.quantity,
            unit_price: row.unit_price,
            status: OrderStatus::from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}

/// Row model for the transactions table
#[derive(Debug, Clone, FromRow)]
pub struct DbTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbTransaction> for Transaction {
    type Error = Error;

    fn try_from(row: DbTransaction) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            amount: row.amount,
            kind: TransactionKind::from_str(&row.kind)?,
            created_at: row.created_at,
        })
    }
}

/// Row model for the watchlist_entries table
#[derive(Debug, Clone, FromRow)]
pub struct DbWatchlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency_id: Uuid,
    pub added_at: DateTime<Utc>,
}

impl From<DbWatchlistEntry> for WatchlistEntry {
    fn from(row: DbWatchlistEntry) -> Self {
        WatchlistEntry {
            id: row.id,
            user_id: row.user_id,
            currency_id: row.currency_id,
            added_at: row.added_at,
        }
    }
}
