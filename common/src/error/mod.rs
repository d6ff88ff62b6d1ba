//! Error types for the exchange platform
//!
//! This module provides a unified error handling system for all services in
//! the workspace. It defines standard error types that can be used across
//! service boundaries and provides consistent error conversion.

use std::fmt::Display;
use thiserror::Error;

/// Exchange platform error type
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input shape or range, user-correctable
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error when a cryptocurrency cannot be found
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// Error when a user cannot be found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Error when an order cannot be found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Error when a watchlist entry cannot be found
    #[error("Watchlist entry not found: {0}")]
    WatchlistEntryNotFound(String),

    /// Error when a sell exceeds the wallet balance
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Error when no market price exists and the policy rejects trading
    #[error("No price available: {0}")]
    NoPriceAvailable(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Decimal conversion error
    #[error("Decimal conversion error: {0}")]
    Decimal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::Validation(msg) => Error::Validation(format!("{}: {}", context, msg)),
                Error::CurrencyNotFound(msg) => {
                    Error::CurrencyNotFound(format!("{}: {}", context, msg))
                }
                Error::UserNotFound(msg) => Error::UserNotFound(format!("{}: {}", context, msg)),
                Error::OrderNotFound(msg) => Error::OrderNotFound(format!("{}: {}", context, msg)),
                Error::WatchlistEntryNotFound(msg) => {
                    Error::WatchlistEntryNotFound(format!("{}: {}", context, msg))
                }
                Error::InsufficientFunds(msg) => {
                    Error::InsufficientFunds(format!("{}: {}", context, msg))
                }
                Error::NoPriceAvailable(msg) => {
                    Error::NoPriceAvailable(format!("{}: {}", context, msg))
                }
                Error::Authentication(msg) => {
                    Error::Authentication(format!("{}: {}", context, msg))
                }
                Error::Configuration(msg) => {
                    Error::Configuration(format!("{}: {}", context, msg))
                }
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::Database(e) => Error::Database(e),
                Error::Migration(e) => Error::Migration(e),
                Error::Serialization(e) => Error::Serialization(e),
                Error::Decimal(msg) => Error::Decimal(format!("{}: {}", context, msg)),
            }
        })
    }
}

/// Convert string messages into an error
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal(message)
    }
}

/// Convert static string references into an error
impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Internal(message.to_string())
    }
}

/// From rust_decimal::Error
impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Decimal(err.to_string())
    }
}
