//! Ledger service: the persistent trade ledger and the services over it
//!
//! Holds users, wallets, orders, transactions, and watchlists, and exposes
//! the trade settlement routine, portfolio valuation, and user/watchlist
//! management.

pub mod config;
pub mod repository;
pub mod service;
pub mod users;
pub mod valuation;

pub use config::LedgerServiceConfig;
pub use repository::{InMemoryLedgerRepository, LedgerRepository, PostgresLedgerRepository};
pub use service::{PricePolicy, Settlement, SettlementService};
pub use users::UserService;
pub use valuation::{PortfolioPosition, PortfolioService, PortfolioValuation};
