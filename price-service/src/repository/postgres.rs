//! PostgreSQL-backed price repository

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use common::db::models::{DbCurrency, DbMarketPrice};
use common::error::{Error, Result};
use common::model::currency::Cryptocurrency;
use common::model::price::MarketPrice;

use super::PriceRepository;

/// PostgreSQL repository for currency and price data
pub struct PostgresPriceRepository {
    /// Database connection pool
    pool: PgPool,
}

impl PostgresPriceRepository {
    /// Create a repository over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool and create a repository over it
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(Error::Database)?;

        info!("Connected price repository to PostgreSQL database");

        Ok(Self { pool })
    }
}

#[async_trait]
impl PriceRepository for PostgresPriceRepository {
    async fn create_currency(&self, currency: Cryptocurrency) -> Result<Cryptocurrency> {
        debug!("Creating currency {} in database", currency.symbol);

        sqlx::query(
            "INSERT INTO currencies (id, name, symbol, blockchain, launch_date)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(currency.id)
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(&currency.blockchain)
        .bind(currency.launch_date)
        .execute(&self.pool)
        .await?;

        Ok(currency)
    }

    async fn get_currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>> {
        let row = sqlx::query_as::<_, DbCurrency>(
            "SELECT id, name, symbol, blockchain, launch_date
             FROM currencies
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cryptocurrency::from))
    }

    async fn get_currency_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>> {
        let row = sqlx::query_as::<_, DbCurrency>(
            "SELECT id, name, symbol, blockchain, launch_date
             FROM currencies
             WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cryptocurrency::from))
    }

    async fn list_currencies(&self) -> Result<Vec<Cryptocurrency>> {
        let rows = sqlx::query_as::<_, DbCurrency>(
            "SELECT id, name, symbol, blockchain, launch_date
             FROM currencies
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Cryptocurrency::from).collect())
    }

    async fn record_price(&self, price: MarketPrice) -> Result<MarketPrice> {
        debug!(
            "Recording price {} for currency {}",
            price.price, price.currency_id
        );

        sqlx::query(
            "INSERT INTO market_prices (id, currency_id, price, recorded_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(price.id)
        .bind(price.currency_id)
        .bind(price.price)
        .bind(price.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(price)
    }

    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>> {
        let row = sqlx::query_as::<_, DbMarketPrice>(
            "SELECT id, currency_id, price, recorded_at
             FROM market_prices
             WHERE currency_id = $1
             ORDER BY recorded_at DESC
             LIMIT 1",
        )
        .bind(currency_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MarketPrice::from))
    }

    async fn price_history(&self, currency_id: Uuid, limit: usize) -> Result<Vec<MarketPrice>> {
        let rows = sqlx::query_as::<_, DbMarketPrice>(
            "SELECT id, currency_id, price, recorded_at
             FROM market_prices
             WHERE currency_id = $1
             ORDER BY recorded_at DESC
             LIMIT $2",
        )
        .bind(currency_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MarketPrice::from).collect())
    }
}
