//! Inventory store
//!
//! Ingredient stock with the clamp-to-zero decrement policy: a deduction
//! larger than the available stock leaves the stock at exactly zero and
//! reports partial success through [`DeductionResult::fully_deducted`],
//! never through an error. Name uniqueness is a check-then-act inside the
//! name-index mutex.

pub mod recipes;

pub use recipes::RecipeEngine;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::models::{DeductionResult, Ingredient, IngredientCreate, IngredientUpdate};
use shared::{AppError, AppResult};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::money;

const DEFAULT_UNIT: &str = "unidades";

/// Ingredient store
#[derive(Debug, Default)]
pub struct InventoryService {
    ingredients: DashMap<String, Ingredient>,
    /// lowercase name → ingredient id; guards name uniqueness
    names: Mutex<HashMap<String, String>>,
}

impl InventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== CRUD ====================

    pub fn create(&self, payload: IngredientCreate) -> AppResult<Ingredient> {
        payload.validate()?;
        let stock = payload.stock.unwrap_or(Decimal::ZERO);
        let min_stock = payload.min_stock.unwrap_or(Decimal::ZERO);
        money::require_non_negative(stock, "stock")?;
        money::require_non_negative(min_stock, "minimum stock")?;

        let key = payload.name.trim().to_lowercase();
        let mut names = self.names.lock();
        if names.contains_key(&key) {
            return Err(AppError::already_exists(format!(
                "ingredient \"{}\"",
                payload.name.trim()
            )));
        }

        let now = Utc::now();
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            stock: money::round_stock(stock),
            min_stock: money::round_stock(min_stock),
            unit: payload
                .unit
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            category: payload.category,
            created_at: now,
            updated_at: now,
        };
        names.insert(key, ingredient.id.clone());
        self.ingredients
            .insert(ingredient.id.clone(), ingredient.clone());
        info!(name = %ingredient.name, stock = %ingredient.stock, "Ingredient created");
        Ok(ingredient)
    }

    pub fn update(&self, id: &str, payload: IngredientUpdate) -> AppResult<Ingredient> {
        payload.validate()?;
        if let Some(min_stock) = payload.min_stock {
            money::require_non_negative(min_stock, "minimum stock")?;
        }

        let mut names = self.names.lock();
        let mut ingredient = self
            .ingredients
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;

        if let Some(name) = payload.name {
            let new_key = name.trim().to_lowercase();
            let old_key = ingredient.name.to_lowercase();
            if new_key != old_key {
                if names.contains_key(&new_key) {
                    return Err(AppError::already_exists(format!(
                        "ingredient \"{}\"",
                        name.trim()
                    )));
                }
                names.remove(&old_key);
                names.insert(new_key, ingredient.id.clone());
            }
            ingredient.name = name.trim().to_string();
        }
        if let Some(min_stock) = payload.min_stock {
            ingredient.min_stock = money::round_stock(min_stock);
        }
        if let Some(unit) = payload.unit {
            ingredient.unit = unit;
        }
        if let Some(category) = payload.category {
            ingredient.category = Some(category);
        }
        ingredient.updated_at = Utc::now();
        Ok(ingredient.clone())
    }

    pub fn remove(&self, id: &str) -> AppResult<()> {
        let mut names = self.names.lock();
        let (_, ingredient) = self
            .ingredients
            .remove(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;
        names.remove(&ingredient.name.to_lowercase());
        info!(name = %ingredient.name, "Ingredient removed");
        Ok(())
    }

    // ==================== Stock ====================

    /// Unconditional stock increase (purchase intake); no upper bound
    pub fn increase_stock(&self, id: &str, quantity: Decimal) -> AppResult<Ingredient> {
        money::require_positive(quantity, "quantity")?;
        let mut ingredient = self
            .ingredients
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;
        ingredient.increase(money::round_stock(quantity), Utc::now());
        info!(
            name = %ingredient.name,
            added = %quantity,
            stock = %ingredient.stock,
            "Stock increased"
        );
        Ok(ingredient.clone())
    }

    /// Decrease stock with the clamp-to-zero policy
    ///
    /// The result reports the quantity actually deducted; callers must
    /// inspect `fully_deducted`; a shortfall is not an error.
    pub fn decrease_stock(&self, id: &str, quantity: Decimal) -> AppResult<DeductionResult> {
        money::require_positive(quantity, "quantity")?;
        let quantity = money::round_stock(quantity);
        let mut ingredient = self
            .ingredients
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;

        let before = ingredient.stock;
        let fully_deducted = ingredient.decrease(quantity, Utc::now());
        let deducted = if fully_deducted { quantity } else { before };
        if !fully_deducted {
            warn!(
                name = %ingredient.name,
                requested = %quantity,
                available = %before,
                "Stock clamped to zero; deduction partially unmet"
            );
        }
        Ok(DeductionResult {
            ingredient_id: ingredient.id.clone(),
            ingredient_name: ingredient.name.clone(),
            requested: quantity,
            deducted,
            remaining_stock: ingredient.stock,
            fully_deducted,
        })
    }

    /// Overwrite the stock level (manual adjustment), recording why
    pub fn set_stock(&self, id: &str, stock: Decimal, reason: &str) -> AppResult<Ingredient> {
        money::require_non_negative(stock, "stock")?;
        let mut ingredient = self
            .ingredients
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;
        let previous = ingredient.stock;
        ingredient.stock = money::round_stock(stock);
        ingredient.updated_at = Utc::now();
        info!(
            name = %ingredient.name,
            from = %previous,
            to = %ingredient.stock,
            reason,
            "Stock adjusted"
        );
        Ok(ingredient.clone())
    }

    pub fn has_sufficient_stock(&self, id: &str, quantity: Decimal) -> AppResult<bool> {
        let ingredient = self
            .ingredients
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))?;
        Ok(ingredient.stock >= quantity)
    }

    // ==================== Queries ====================

    pub fn get(&self, id: &str) -> AppResult<Ingredient> {
        self.ingredients
            .get(id)
            .map(|i| i.clone())
            .ok_or_else(|| AppError::not_found(format!("ingredient {}", id)))
    }

    pub fn get_by_name(&self, name: &str) -> AppResult<Ingredient> {
        let id = {
            let names = self.names.lock();
            names.get(&name.trim().to_lowercase()).cloned()
        };
        id.and_then(|id| self.ingredients.get(&id).map(|i| i.clone()))
            .ok_or_else(|| AppError::not_found(format!("ingredient \"{}\"", name)))
    }

    /// All ingredients, sorted by name
    pub fn list(&self) -> Vec<Ingredient> {
        let mut all: Vec<Ingredient> = self.ingredients.iter().map(|i| i.clone()).collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        all
    }

    pub fn search(&self, term: &str) -> Vec<Ingredient> {
        let term = term.to_lowercase();
        let mut found: Vec<Ingredient> = self
            .ingredients
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&term))
            .map(|i| i.clone())
            .collect();
        found.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        found
    }

    pub fn list_by_category(&self, category: &str) -> Vec<Ingredient> {
        self.ingredients
            .iter()
            .filter(|i| {
                i.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .map(|i| i.clone())
            .collect()
    }

    /// Ingredients at or below their minimum stock
    pub fn low_stock(&self) -> Vec<Ingredient> {
        self.ingredients
            .iter()
            .filter(|i| i.is_low_stock())
            .map(|i| i.clone())
            .collect()
    }

    pub fn depleted(&self) -> Vec<Ingredient> {
        self.ingredients
            .iter()
            .filter(|i| i.is_depleted())
            .map(|i| i.clone())
            .collect()
    }

    pub fn low_stock_count(&self) -> usize {
        self.ingredients.iter().filter(|i| i.is_low_stock()).count()
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .ingredients
            .iter()
            .filter_map(|i| i.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}
