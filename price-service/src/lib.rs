//! Price service: the currency directory and append-only market prices

pub mod repository;
pub mod service;

pub use repository::{InMemoryPriceRepository, PostgresPriceRepository, PriceRepository};
pub use service::{CurrencyQuote, PricingService};
