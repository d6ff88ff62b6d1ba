//! Repository for currency and market price data

mod postgres;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use common::error::Result;
use common::model::currency::Cryptocurrency;
use common::model::price::MarketPrice;

pub use postgres::PostgresPriceRepository;

/// Price repository trait defining the interface for market data storage
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Register a new currency
    async fn create_currency(&self, currency: Cryptocurrency) -> Result<Cryptocurrency>;

    /// Get a currency by ID
    async fn get_currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>>;

    /// Get a currency by ticker symbol
    async fn get_currency_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>>;

    /// List all currencies ordered by name
    async fn list_currencies(&self) -> Result<Vec<Cryptocurrency>>;

    /// Append a price observation; observations are never updated in place
    async fn record_price(&self, price: MarketPrice) -> Result<MarketPrice>;

    /// The observation with the maximum timestamp for a currency
    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>>;

    /// Recent observations for a currency, newest first
    async fn price_history(&self, currency_id: Uuid, limit: usize) -> Result<Vec<MarketPrice>>;
}

/// In-memory repository for currency and price data
pub struct InMemoryPriceRepository {
    /// Currencies by ID
    currencies: DashMap<Uuid, Cryptocurrency>,
    /// Price observations by currency ID, in insertion order
    prices: DashMap<Uuid, Vec<MarketPrice>>,
}

impl InMemoryPriceRepository {
    /// Create a new in-memory price repository
    pub fn new() -> Self {
        Self {
            currencies: DashMap::new(),
            prices: DashMap::new(),
        }
    }
}

impl Default for InMemoryPriceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceRepository for InMemoryPriceRepository {
    async fn create_currency(&self, currency: Cryptocurrency) -> Result<Cryptocurrency> {
        self.currencies.insert(currency.id, currency.clone());
        Ok(currency)
    }

    async fn get_currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>> {
        Ok(self.currencies.get(&id).map(|c| c.clone()))
    }

    async fn get_currency_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>> {
        Ok(self
            .currencies
            .iter()
            .find(|entry| entry.value().symbol == symbol)
            .map(|entry| entry.value().clone()))
    }

    async fn list_currencies(&self) -> Result<Vec<Cryptocurrency>> {
        let mut currencies: Vec<Cryptocurrency> =
            self.currencies.iter().map(|c| c.clone()).collect();
        currencies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(currencies)
    }

    async fn record_price(&self, price: MarketPrice) -> Result<MarketPrice> {
        self.prices
            .entry(price.currency_id)
            .or_default()
            .push(price.clone());
        Ok(price)
    }

    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>> {
        // max_by_key keeps the last maximum, so ties resolve to the most
        // recently recorded observation
        Ok(self.prices.get(&currency_id).and_then(|prices| {
            prices
                .iter()
                .max_by_key(|p| p.recorded_at)
                .cloned()
        }))
    }

    async fn price_history(&self, currency_id: Uuid, limit: usize) -> Result<Vec<MarketPrice>> {
        Ok(self
            .prices
            .get(&currency_id)
            .map(|prices| {
                let mut history = prices.clone();
                history.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
                history.truncate(limit);
                history
            })
            .unwrap_or_default())
    }
}
