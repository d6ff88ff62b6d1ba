//! Trade settlement service implementation

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use common::decimal::{dec, precision, validate_trade_quantity, Price, Quantity};
use common::error::{Error, Result};
use common::model::price::PriceFeed;
use common::model::trade::{Order, Side, Transaction};
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::repository::LedgerRepository;

/// Policy for resolving a trade when the currency has no market price yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePolicy {
    /// Settle at a fixed fallback unit price. Keeps an empty demo market
    /// usable at the cost of masking missing price data.
    Fallback(Price),
    /// Refuse the trade with `NoPriceAvailable`.
    Reject,
}

impl Default for PricePolicy {
    fn default() -> Self {
        PricePolicy::Fallback(dec!(100.00))
    }
}

/// Confirmation of a settled trade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Settlement {
    /// The completed order
    pub order: Order,
    /// The transaction recording the value movement
    pub transaction: Transaction,
    /// The wallet balance after settlement
    pub wallet_balance: Quantity,
}

/// Trade settlement service: applies a buy or sell for one user against one
/// currency as a single atomic unit, or changes nothing.
pub struct SettlementService {
    /// Repository for ledger data
    repo: Arc<dyn LedgerRepository>,
    /// Price feed for currency lookups and price resolution
    prices: Arc<dyn PriceFeed>,
    /// Policy applied when no market price exists
    policy: PricePolicy,
    /// One writer per wallet key: the lock is held across the whole
    /// read-check-write sequence so concurrent sells cannot overdraw
    wallet_locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl SettlementService {
    /// Create a settlement service with the default price policy
    pub fn new(repo: Arc<dyn LedgerRepository>, prices: Arc<dyn PriceFeed>) -> Self {
        Self::with_policy(repo, prices, PricePolicy::default())
    }

    /// Create a settlement service with an explicit price policy
    pub fn with_policy(
        repo: Arc<dyn LedgerRepository>,
        prices: Arc<dyn PriceFeed>,
        policy: PricePolicy,
    ) -> Self {
        Self {
            repo,
            prices,
            policy,
            wallet_locks: DashMap::new(),
        }
    }

    /// Buy `quantity` units of a currency for a user.
    ///
    /// There is no funds-source check: buying is unconstrained beyond input
    /// validation, matching the demo's cashless wallet model.
    pub async fn buy(&self, user_id: Uuid, currency_id: Uuid, quantity: Quantity) -> Result<Settlement> {
        self.settle(user_id, currency_id, Side::Buy, quantity).await
    }

    /// Sell `quantity` units of a currency for a user; fails with
    /// `InsufficientFunds` when the wallet is absent or too small.
    pub async fn sell(&self, user_id: Uuid, currency_id: Uuid, quantity: Quantity) -> Result<Settlement> {
        self.settle(user_id, currency_id, Side::Sell, quantity).await
    }

    /// Recent orders for a user, newest first
    pub async fn recent_orders(&self, user_id: Uuid, limit: usize) -> Result<Vec<Order>> {
        self.repo.orders_for_user(user_id, limit).await
    }

    /// Recent transactions for a user, newest first
    pub async fn recent_transactions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        self.repo.transactions_for_user(user_id, limit).await
    }

    async fn settle(
        &self,
        user_id: Uuid,
        currency_id: Uuid,
        side: Side,
        quantity: Quantity,
    ) -> Result<Settlement> {
        validate_trade_quantity(quantity)?;

        let _user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let currency = self
            .prices
            .currency(currency_id)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(currency_id.to_string()))?;

        let lock = self.wallet_lock(user_id, currency_id);
        let _guard = lock.lock().await;

        let unit_price = self.resolve_unit_price(currency_id).await?;
        let amount = precision::round_money(quantity * unit_price);

        if side == Side::Sell {
            match self.repo.get_wallet(user_id, currency_id).await? {
                None => {
                    return Err(Error::InsufficientFunds(format!(
                        "no {} wallet for user {}",
                        currency.symbol, user_id
                    )));
                }
                Some(wallet) if wallet.balance < quantity => {
                    return Err(Error::InsufficientFunds(format!(
                        "{} balance {} is less than requested {}",
                        currency.symbol, wallet.balance, quantity
                    )));
                }
                Some(_) => {}
            }
        }

        let order = Order::new(user_id, currency_id, side, quantity, unit_price);
        let transaction = Transaction::new(&order, amount);
        let delta = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        let wallet = self.repo.apply_settlement(&order, &transaction, delta).await?;

        info!(
            "Settled {} {} {} at {} for user {} (amount {})",
            side, quantity, currency.symbol, unit_price, user_id, amount
        );

        Ok(Settlement {
            order,
            transaction,
            wallet_balance: wallet.balance,
        })
    }

    /// Latest market price, or whatever the policy dictates for an empty
    /// market
    async fn resolve_unit_price(&self, currency_id: Uuid) -> Result<Price> {
        match self.prices.latest_price(currency_id).await? {
            Some(observation) => Ok(observation.price),
            None => match self.policy {
                PricePolicy::Fallback(price) => {
                    debug!(
                        "No market price for currency {}, using fallback {}",
                        currency_id, price
                    );
                    Ok(price)
                }
                PricePolicy::Reject => Err(Error::NoPriceAvailable(format!(
                    "no market price recorded for currency {}",
                    currency_id
                ))),
            },
        }
    }

    fn wallet_lock(&self, user_id: Uuid, currency_id: Uuid) -> Arc<Mutex<()>> {
        self.wallet_locks
            .entry((user_id, currency_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
