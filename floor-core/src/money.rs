//! Money and quantity arithmetic using rust_decimal
//!
//! All monetary values are `Decimal` rounded to 2 places (half-up); stock
//! quantities use 3 places. Range checks run before any mutation.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::{AppError, AppResult};

/// Rounding for monetary values (2 decimal places, half-up)
pub const MONEY_DP: u32 = 2;

/// Rounding for stock quantities (3 decimal places)
pub const STOCK_DP: u32 = 3;

/// Maximum accepted amount for a single price, payment or stock movement
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round a monetary value to cents
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a stock quantity to 3 decimals
pub fn round_stock(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(STOCK_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity × unit price, rounded to cents
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Require a strictly positive amount
pub fn require_positive(value: Decimal, field: &str) -> AppResult<()> {
    if value <= Decimal::ZERO {
        return Err(AppError::out_of_range(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    require_within_bounds(value, field)
}

/// Require a non-negative amount
pub fn require_non_negative(value: Decimal, field: &str) -> AppResult<()> {
    if value < Decimal::ZERO {
        return Err(AppError::out_of_range(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    require_within_bounds(value, field)
}

fn require_within_bounds(value: Decimal, field: &str) -> AppResult<()> {
    if value > MAX_AMOUNT {
        return Err(AppError::out_of_range(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field, MAX_AMOUNT, value
        )));
    }
    Ok(())
}
