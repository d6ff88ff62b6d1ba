//! Application configuration

use std::env;

/// Application configuration
pub struct AppConfig {
    /// Database URL; the gateway runs on in-memory stores when unset
    pub database_url: Option<String>,
    /// Database connection pool size
    pub db_pool_size: u32,
    /// Seed demo currencies and prices when running in-memory
    pub seed_demo_data: bool,
    /// Reject trades on unpriced currencies instead of using the fallback
    /// price
    pub reject_unpriced: bool,
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn new() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok(),
            db_pool_size: env::var("DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            reject_unpriced: env::var("TRADE_REJECT_UNPRICED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
