//! Portfolio valuation: read-only aggregation of wallets against prices

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::decimal::{precision, Amount, Price, Quantity};
use common::error::{Error, Result};
use common::model::price::PriceFeed;
use common::model::wallet::Wallet;
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::repository::LedgerRepository;

/// One valued holding in a portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PortfolioPosition {
    /// Held currency
    pub currency_id: Uuid,
    /// Currency name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Wallet balance
    pub balance: Quantity,
    /// Latest unit price; `None` when the currency has never been priced
    pub unit_price: Option<Price>,
    /// balance x unit price, rounded to 2 decimal places; zero when unpriced
    pub value: Amount,
}

/// A user's portfolio at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PortfolioValuation {
    /// Valued user
    pub user_id: Uuid,
    /// Holdings ordered by symbol
    pub positions: Vec<PortfolioPosition>,
    /// Sum of position values
    pub total_value: Amount,
    /// When the valuation was computed
    pub valued_at: DateTime<Utc>,
}

/// Portfolio valuation service. Purely derived, no side effects; safe to
/// call concurrently and repeatedly.
pub struct PortfolioService {
    /// Repository for ledger data
    repo: Arc<dyn LedgerRepository>,
    /// Price feed for currency metadata and latest prices
    prices: Arc<dyn PriceFeed>,
}

impl PortfolioService {
    /// Create a new portfolio service
    pub fn new(repo: Arc<dyn LedgerRepository>, prices: Arc<dyn PriceFeed>) -> Self {
        Self { repo, prices }
    }

    /// All wallets belonging to a user
    pub async fn holdings(&self, user_id: Uuid) -> Result<Vec<Wallet>> {
        let _user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        self.repo.wallets_for_user(user_id).await
    }

    /// Value a user's holdings against the latest prices.
    ///
    /// Currencies without a wallet row are omitted. A wallet whose currency
    /// has no price observation is kept as a zero-valued position rather
    /// than dropped, so holdings never silently vanish from the report.
    pub async fn value_portfolio(&self, user_id: Uuid) -> Result<PortfolioValuation> {
        let wallets = self.holdings(user_id).await?;
        let mut positions = Vec::with_capacity(wallets.len());

        for wallet in wallets {
            let currency = self
                .prices
                .currency(wallet.currency_id)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "wallet references unknown currency {}",
                        wallet.currency_id
                    ))
                })?;

            let latest = self.prices.latest_price(wallet.currency_id).await?;
            let (unit_price, value) = match latest {
                Some(observation) => (
                    Some(observation.price),
                    precision::round_money(wallet.balance * observation.price),
                ),
                None => (None, Amount::ZERO),
            };

            positions.push(PortfolioPosition {
                currency_id: wallet.currency_id,
                name: currency.name,
                symbol: currency.symbol,
                balance: wallet.balance,
                unit_price,
                value,
            });
        }

        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let total_value = positions
            .iter()
            .fold(Amount::ZERO, |total, position| total + position.value);

        Ok(PortfolioValuation {
            user_id,
            positions,
            total_value,
            valued_at: Utc::now(),
        })
    }
}
