//! Pricing service implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use common::decimal::{precision, Price};
use common::error::{Error, Result};
use common::model::currency::Cryptocurrency;
use common::model::price::{MarketPrice, PriceFeed};
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::repository::PriceRepository;

/// A currency together with its most recent quote, as shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct CurrencyQuote {
    /// The currency
    pub currency: Cryptocurrency,
    /// Latest unit price, absent when no observation exists yet
    pub latest_price: Option<Price>,
    /// Timestamp of the latest observation
    pub as_of: Option<DateTime<Utc>>,
}

/// Pricing service: the currency directory plus append-only market prices
pub struct PricingService {
    /// Repository for currency and price data
    repo: Arc<dyn PriceRepository>,
}

impl PricingService {
    /// Create a new pricing service over a repository
    pub fn new(repo: Arc<dyn PriceRepository>) -> Self {
        Self { repo }
    }

    /// Register a new currency
    pub async fn create_currency(
        &self,
        name: &str,
        symbol: &str,
        blockchain: Option<String>,
        launch_date: Option<NaiveDate>,
    ) -> Result<Cryptocurrency> {
        let name = name.trim();
        let symbol = symbol.trim().to_uppercase();

        if name.is_empty() {
            return Err(Error::Validation("currency name must not be empty".into()));
        }
        if symbol.is_empty() {
            return Err(Error::Validation(
                "currency symbol must not be empty".into(),
            ));
        }
        if self.repo.get_currency_by_symbol(&symbol).await?.is_some() {
            return Err(Error::Validation(format!(
                "currency with symbol {} already exists",
                symbol
            )));
        }

        info!("Registering currency {} ({})", name, symbol);

        self.repo
            .create_currency(Cryptocurrency::new(
                name.to_string(),
                symbol,
                blockchain,
                launch_date,
            ))
            .await
    }

    /// Get a currency by ID
    pub async fn get_currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>> {
        self.repo.get_currency(id).await
    }

    /// List all currencies ordered by name
    pub async fn list_currencies(&self) -> Result<Vec<Cryptocurrency>> {
        self.repo.list_currencies().await
    }

    /// List all currencies with their latest quote attached
    pub async fn list_currency_quotes(&self) -> Result<Vec<CurrencyQuote>> {
        let currencies = self.repo.list_currencies().await?;
        let mut quotes = Vec::with_capacity(currencies.len());

        for currency in currencies {
            let latest = self.repo.latest_price(currency.id).await?;
            quotes.push(CurrencyQuote {
                currency,
                latest_price: latest.as_ref().map(|p| p.price),
                as_of: latest.map(|p| p.recorded_at),
            });
        }

        Ok(quotes)
    }

    /// Append a new price observation for a currency
    pub async fn record_price(&self, currency_id: Uuid, price: Price) -> Result<MarketPrice> {
        if price <= Decimal::ZERO {
            return Err(Error::Validation(format!(
                "price must be positive, got {}",
                price
            )));
        }
        if price.normalize().scale() > precision::MONEY_DP {
            return Err(Error::Validation(format!(
                "price {} has more than {} decimal places",
                price,
                precision::MONEY_DP
            )));
        }

        let currency = self
            .repo
            .get_currency(currency_id)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(currency_id.to_string()))?;

        info!("Recording price {} for {}", price, currency.symbol);

        self.repo
            .record_price(MarketPrice::new(currency_id, price))
            .await
    }

    /// Recent price observations for a currency, newest first
    pub async fn price_history(&self, currency_id: Uuid, limit: usize) -> Result<Vec<MarketPrice>> {
        let _currency = self
            .repo
            .get_currency(currency_id)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(currency_id.to_string()))?;

        self.repo.price_history(currency_id, limit).await
    }
}

#[async_trait]
impl PriceFeed for PricingService {
    async fn currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>> {
        self.repo.get_currency(id).await
    }

    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>> {
        debug!("Resolving latest price for currency {}", currency_id);
        self.repo.latest_price(currency_id).await
    }
}
