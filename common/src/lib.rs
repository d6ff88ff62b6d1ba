//! Common types and utilities for the exchange platform
//!
//! This library contains the types shared across all service crates in the
//! workspace: the unified error taxonomy, fixed-point decimal helpers for
//! monetary math, the domain models, and database access plumbing.

pub mod db;
pub mod decimal;
pub mod error;
pub mod model;

/// Re-export important types
pub use decimal::*;
pub use error::{Error, ErrorExt, Result};

// Re-export utoipa for use in model ToSchema derives
#[cfg(feature = "utoipa")]
pub use utoipa;
