//! Shared service state
//!
//! `ServerState` bundles the five services behind `Arc`s so the
//! surrounding request-handling layer can clone it cheaply per request.

use std::sync::Arc;

use crate::core::Config;
use crate::inventory::{InventoryService, RecipeEngine};
use crate::orders::OrderService;
use crate::tables::TableRegistry;
use crate::till::CashTill;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub tables: Arc<TableRegistry>,
    pub orders: Arc<OrderService>,
    pub till: Arc<CashTill>,
    pub inventory: Arc<InventoryService>,
    pub recipes: Arc<RecipeEngine>,
}

impl ServerState {
    /// Wire up the service graph
    ///
    /// Leaves first: inventory feeds the recipe engine; the order service
    /// holds handles to the table registry, the till and the recipe
    /// engine.
    pub fn initialize(config: Config) -> Self {
        let inventory = Arc::new(InventoryService::new());
        let recipes = Arc::new(RecipeEngine::new(inventory.clone()));
        let tables = Arc::new(TableRegistry::new(config.default_table_capacity));
        let till = Arc::new(CashTill::new(config.timezone));
        let orders = Arc::new(OrderService::new(
            config.timezone,
            tables.clone(),
            till.clone(),
            recipes.clone(),
        ));

        Self {
            config,
            tables,
            orders,
            till,
            inventory,
            recipes,
        }
    }

    pub fn tables(&self) -> &Arc<TableRegistry> {
        &self.tables
    }

    pub fn orders(&self) -> &Arc<OrderService> {
        &self.orders
    }

    pub fn till(&self) -> &Arc<CashTill> {
        &self.till
    }

    pub fn inventory(&self) -> &Arc<InventoryService> {
        &self.inventory
    }

    pub fn recipes(&self) -> &Arc<RecipeEngine> {
        &self.recipes
    }
}
