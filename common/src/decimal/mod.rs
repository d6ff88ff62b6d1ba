//! Decimal type utilities for precise financial calculations

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
pub use rust_decimal_macros::dec;

use crate::error::{Error, Result};

/// Unit price type (2 decimal places once rounded)
pub type Price = Decimal;

/// Wallet/trade quantity type (up to 8 decimal places)
pub type Quantity = Decimal;

/// Monetary amount type (typically Price * Quantity, 2 decimal places)
pub type Amount = Decimal;

/// Precision helpers for common operations
pub mod precision {
    use super::*;

    /// Monetary precision (2 decimal places)
    pub const MONEY_DP: u32 = 2;

    /// Wallet balance precision (8 decimal places)
    pub const BALANCE_DP: u32 = 8;

    /// Round a monetary amount to 2 decimal places.
    ///
    /// Uses banker's rounding (midpoint-to-even) so repeated settlement math
    /// does not drift in one direction.
    pub fn round_money(amount: Amount) -> Amount {
        amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
    }

    /// Round a wallet balance to standard precision
    pub fn round_balance(balance: Quantity) -> Quantity {
        balance.round_dp(BALANCE_DP)
    }
}

/// Validate a trade quantity: strictly positive, at most 2 decimal places.
pub fn validate_trade_quantity(quantity: Quantity) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }

    if quantity.normalize().scale() > precision::MONEY_DP {
        return Err(Error::Validation(format!(
            "quantity {} has more than {} decimal places",
            quantity,
            precision::MONEY_DP
        )));
    }

    Ok(())
}

/// Parse a trade quantity from its wire representation (a decimal string)
/// and validate it.
pub fn parse_trade_quantity(input: &str) -> Result<Quantity> {
    let quantity = Decimal::from_str(input.trim())
        .map_err(|_| Error::Validation(format!("invalid quantity: {:?}", input)))?;
    validate_trade_quantity(quantity)?;
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rounds_midpoint_to_even() {
        assert_eq!(precision::round_money(dec!(15.015)), dec!(15.02));
        assert_eq!(precision::round_money(dec!(15.025)), dec!(15.02));
        assert_eq!(precision::round_money(dec!(15.014)), dec!(15.01));
    }

    #[test]
    fn quantity_validation() {
        assert!(validate_trade_quantity(dec!(0.01)).is_ok());
        assert!(validate_trade_quantity(dec!(1.50)).is_ok());
        assert!(validate_trade_quantity(dec!(0)).is_err());
        assert!(validate_trade_quantity(dec!(-3)).is_err());
        assert!(validate_trade_quantity(dec!(0.001)).is_err());
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_trade_quantity("0.50").unwrap(), dec!(0.50));
        assert_eq!(parse_trade_quantity(" 2 ").unwrap(), dec!(2));
        assert!(parse_trade_quantity("abc").is_err());
        assert!(parse_trade_quantity("").is_err());
        assert!(parse_trade_quantity("0.123").is_err());
    }
}
