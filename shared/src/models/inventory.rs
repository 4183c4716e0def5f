//! Inventory model
//!
//! Ingredient stock is tracked at 3-decimal precision and never goes
//! negative: a decrement larger than the current stock clamps to zero and
//! reports partial success instead of raising an error. The unmet
//! remainder is discarded (no backorder tracking); low-stock alerting
//! relies on this clamp.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Ingredient (raw material) entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    /// Unique (case-insensitive) display name
    pub name: String,
    /// Current stock, 3-decimal precision, never negative
    pub stock: Decimal,
    /// Threshold below which the ingredient counts as low stock
    pub min_stock: Decimal,
    /// Unit of measure (kg, l, unidades, …)
    pub unit: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    pub fn is_depleted(&self) -> bool {
        self.stock <= Decimal::ZERO
    }

    /// Unconditional stock increase (purchases); no upper bound
    pub fn increase(&mut self, quantity: Decimal, now: DateTime<Utc>) {
        self.stock += quantity;
        self.updated_at = now;
    }

    /// Decrease stock, clamping at zero
    ///
    /// Returns `true` when the full quantity was deducted, `false` when
    /// the stock was clamped to zero with part of the request unmet.
    pub fn decrease(&mut self, quantity: Decimal, now: DateTime<Utc>) -> bool {
        self.updated_at = now;
        if self.stock >= quantity {
            self.stock -= quantity;
            true
        } else {
            self.stock = Decimal::ZERO;
            false
        }
    }
}

/// One recipe line: the quantity of an ingredient consumed by one unit of
/// a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: String,
    pub quantity_per_unit: Decimal,
}

/// Create ingredient payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngredientCreate {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// Initial stock; defaults to zero
    pub stock: Option<Decimal>,
    pub min_stock: Option<Decimal>,
    /// Defaults to "unidades"
    pub unit: Option<String>,
    pub category: Option<String>,
}

/// Update ingredient payload (stock is adjusted through the dedicated
/// stock operations, not here)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngredientUpdate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub min_stock: Option<Decimal>,
    pub unit: Option<String>,
    pub category: Option<String>,
}

/// Recipe line input payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecipeLineInput {
    #[validate(length(min = 1, message = "ingredient id is required"))]
    pub ingredient_id: String,
    pub quantity_per_unit: Decimal,
}

/// Outcome of one ingredient deduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionResult {
    pub ingredient_id: String,
    pub ingredient_name: String,
    /// Quantity the recipe called for
    pub requested: Decimal,
    /// Quantity actually removed from stock
    pub deducted: Decimal,
    pub remaining_stock: Decimal,
    /// False when the stock was clamped to zero short of the request
    pub fully_deducted: bool,
}

/// Aggregate outcome of deducting a whole order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeductionSummary {
    pub results: Vec<DeductionResult>,
    /// Names of ingredients that ended at zero stock
    pub depleted: Vec<String>,
}

impl DeductionSummary {
    pub fn fully_deducted(&self) -> bool {
        self.results.iter().all(|r| r.fully_deducted)
    }
}

/// One insufficient ingredient in an availability check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortfall {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub required: Decimal,
    pub available: Decimal,
}

/// Result of a read-only availability check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub shortfalls: Vec<Shortfall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemon(stock: i64) -> Ingredient {
        let now = Utc::now();
        Ingredient {
            id: "i-1".to_string(),
            name: "lemon".to_string(),
            stock: Decimal::from(stock),
            min_stock: Decimal::from(5),
            unit: "unidades".to_string(),
            category: Some("produce".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_decrease_within_stock() {
        let mut ing = lemon(10);
        assert!(ing.decrease(Decimal::from(4), Utc::now()));
        assert_eq!(ing.stock, Decimal::from(6));
    }

    #[test]
    fn test_decrease_clamps_to_zero() {
        let mut ing = lemon(10);
        assert!(!ing.decrease(Decimal::from(12), Utc::now()));
        assert_eq!(ing.stock, Decimal::ZERO);
    }

    #[test]
    fn test_low_stock_threshold_inclusive() {
        let mut ing = lemon(10);
        assert!(!ing.is_low_stock());
        ing.decrease(Decimal::from(5), Utc::now());
        assert!(ing.is_low_stock());
        assert!(!ing.is_depleted());
    }
}
