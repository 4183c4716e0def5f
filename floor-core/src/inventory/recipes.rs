//! Recipe deduction engine
//!
//! Maps a sellable product to the ingredients one unit consumes and
//! applies the deductions against the inventory store. Recipe
//! replacement is a single atomic swap under the write lock, so there is
//! no observable empty-recipe window between delete and insert.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::models::{
    AvailabilityReport, DeductionResult, DeductionSummary, RecipeLine, RecipeLineInput, Shortfall,
};
use shared::{AppError, AppResult, ErrorCode};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use super::InventoryService;
use crate::money;

/// Recipe catalog + deduction engine
pub struct RecipeEngine {
    recipes: RwLock<HashMap<String, Vec<RecipeLine>>>,
    inventory: Arc<InventoryService>,
}

impl RecipeEngine {
    pub fn new(inventory: Arc<InventoryService>) -> Self {
        Self {
            recipes: RwLock::new(HashMap::new()),
            inventory,
        }
    }

    // ==================== Catalog ====================

    /// Replace a product's entire recipe atomically
    ///
    /// Every line must reference a known ingredient; duplicate
    /// ingredients within one recipe are rejected. An empty line list
    /// clears the recipe.
    pub fn set_recipe(
        &self,
        product_id: &str,
        lines: Vec<RecipeLineInput>,
    ) -> AppResult<Vec<RecipeLine>> {
        let mut seen = HashSet::new();
        let mut recipe = Vec::with_capacity(lines.len());
        for line in lines {
            line.validate()?;
            money::require_positive(line.quantity_per_unit, "quantity per unit")?;
            if !seen.insert(line.ingredient_id.clone()) {
                return Err(AppError::validation(format!(
                    "ingredient {} appears more than once in the recipe",
                    line.ingredient_id
                )));
            }
            if self.inventory.get(&line.ingredient_id).is_err() {
                return Err(AppError::with_message(
                    ErrorCode::UnknownRecipeIngredient,
                    format!("unknown ingredient: {}", line.ingredient_id),
                )
                .with_detail("ingredient_id", line.ingredient_id.clone()));
            }
            recipe.push(RecipeLine {
                ingredient_id: line.ingredient_id,
                quantity_per_unit: money::round_stock(line.quantity_per_unit),
            });
        }

        let mut recipes = self.recipes.write();
        if recipe.is_empty() {
            recipes.remove(product_id);
        } else {
            recipes.insert(product_id.to_string(), recipe.clone());
        }
        info!(product_id, lines = recipe.len(), "Recipe replaced");
        Ok(recipe)
    }

    /// A product's recipe; empty when none is assigned
    pub fn get_recipe(&self, product_id: &str) -> Vec<RecipeLine> {
        self.recipes
            .read()
            .get(product_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_recipe(&self, product_id: &str) -> bool {
        self.recipes.read().contains_key(product_id)
    }

    /// Add or update a single recipe line
    pub fn add_line(&self, product_id: &str, line: RecipeLineInput) -> AppResult<RecipeLine> {
        line.validate()?;
        money::require_positive(line.quantity_per_unit, "quantity per unit")?;
        if self.inventory.get(&line.ingredient_id).is_err() {
            return Err(AppError::with_message(
                ErrorCode::UnknownRecipeIngredient,
                format!("unknown ingredient: {}", line.ingredient_id),
            ));
        }

        let new_line = RecipeLine {
            ingredient_id: line.ingredient_id,
            quantity_per_unit: money::round_stock(line.quantity_per_unit),
        };
        let mut recipes = self.recipes.write();
        let recipe = recipes.entry(product_id.to_string()).or_default();
        match recipe
            .iter_mut()
            .find(|l| l.ingredient_id == new_line.ingredient_id)
        {
            Some(existing) => existing.quantity_per_unit = new_line.quantity_per_unit,
            None => recipe.push(new_line.clone()),
        }
        Ok(new_line)
    }

    /// Remove one ingredient from a product's recipe
    pub fn remove_line(&self, product_id: &str, ingredient_id: &str) -> AppResult<()> {
        let mut recipes = self.recipes.write();
        let recipe = recipes
            .get_mut(product_id)
            .ok_or_else(|| AppError::not_found(format!("recipe for product {}", product_id)))?;
        let before = recipe.len();
        recipe.retain(|l| l.ingredient_id != ingredient_id);
        if recipe.len() == before {
            return Err(AppError::not_found(format!(
                "ingredient {} in recipe for product {}",
                ingredient_id, product_id
            )));
        }
        if recipe.is_empty() {
            recipes.remove(product_id);
        }
        Ok(())
    }

    pub fn remove_recipe(&self, product_id: &str) -> AppResult<()> {
        self.recipes
            .write()
            .remove(product_id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("recipe for product {}", product_id)))
    }

    /// Products whose recipes use an ingredient
    pub fn products_using(&self, ingredient_id: &str) -> Vec<String> {
        let mut products: Vec<String> = self
            .recipes
            .read()
            .iter()
            .filter(|(_, lines)| lines.iter().any(|l| l.ingredient_id == ingredient_id))
            .map(|(product, _)| product.clone())
            .collect();
        products.sort();
        products
    }

    // ==================== Availability ====================

    /// Check whether stock covers `quantity` units of a product. Never
    /// mutates state; a product without a recipe is always available.
    pub fn check_availability(
        &self,
        product_id: &str,
        quantity: i32,
    ) -> AppResult<AvailabilityReport> {
        if quantity < 1 {
            return Err(AppError::out_of_range("quantity must be at least 1"));
        }
        let recipe = self.get_recipe(product_id);
        let mut shortfalls = Vec::new();
        for line in &recipe {
            let required =
                money::round_stock(line.quantity_per_unit * Decimal::from(quantity));
            let ingredient = self.inventory.get(&line.ingredient_id)?;
            if ingredient.stock < required {
                shortfalls.push(Shortfall {
                    ingredient_id: ingredient.id,
                    ingredient_name: ingredient.name,
                    required,
                    available: ingredient.stock,
                });
            }
        }
        Ok(AvailabilityReport {
            available: shortfalls.is_empty(),
            shortfalls,
        })
    }

    // ==================== Deduction ====================

    /// Deduct the ingredients consumed by `quantity_sold` units of a
    /// product
    ///
    /// A product without a recipe is a no-op (logged). Each line applies
    /// the store's clamp-to-zero policy independently; a partial
    /// deduction is a valid terminal outcome, and earlier lines are never
    /// rolled back.
    pub fn deduct_for_sale(
        &self,
        product_id: &str,
        quantity_sold: i32,
    ) -> AppResult<Vec<DeductionResult>> {
        if quantity_sold < 1 {
            return Err(AppError::out_of_range("quantity must be at least 1"));
        }
        let recipe = self.get_recipe(product_id);
        if recipe.is_empty() {
            debug!(product_id, "Product has no recipe; nothing to deduct");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(recipe.len());
        for line in &recipe {
            let required =
                money::round_stock(line.quantity_per_unit * Decimal::from(quantity_sold));
            let result = self.inventory.decrease_stock(&line.ingredient_id, required)?;
            results.push(result);
        }
        info!(
            product_id,
            quantity_sold,
            lines = results.len(),
            "Ingredients deducted for sale"
        );
        Ok(results)
    }

    /// Deduct an order's worth of products, collecting depleted-stock
    /// alerts
    pub fn deduct_for_order(&self, items: &[(String, i32)]) -> AppResult<DeductionSummary> {
        let mut summary = DeductionSummary::default();
        for (product_id, quantity) in items {
            let results = self.deduct_for_sale(product_id, *quantity)?;
            for result in &results {
                if result.remaining_stock <= Decimal::ZERO
                    && !summary.depleted.contains(&result.ingredient_name)
                {
                    summary.depleted.push(result.ingredient_name.clone());
                }
            }
            summary.results.extend(results);
        }
        if !summary.depleted.is_empty() {
            tracing::warn!(depleted = ?summary.depleted, "Ingredients depleted by order");
        }
        Ok(summary)
    }
}
