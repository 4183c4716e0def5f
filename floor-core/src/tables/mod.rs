//! Table registry
//!
//! Per-table occupancy state and the running consumption total kept in
//! sync by the order service. Each table is one unit of mutual exclusion:
//! all mutation goes through the entry guard of the backing map, so
//! concurrent operations on the same table serialize.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Table, TableCreate, TableOccupy, TableStatus};
use shared::{AppError, AppResult, ErrorCode};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::money;

/// Per-status table counts
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TableCounts {
    pub available: usize,
    pub occupied: usize,
    pub reserved: usize,
}

/// Registry of dining tables, keyed by table number
#[derive(Debug)]
pub struct TableRegistry {
    tables: DashMap<u32, Table>,
    default_capacity: i32,
}

impl TableRegistry {
    pub fn new(default_capacity: i32) -> Self {
        Self {
            tables: DashMap::new(),
            default_capacity,
        }
    }

    // ==================== Administration ====================

    /// Register a new table; the number is its immutable identity
    pub fn register(&self, payload: TableCreate) -> AppResult<Table> {
        payload.validate()?;
        let capacity = payload.capacity.unwrap_or(self.default_capacity);

        match self.tables.entry(payload.number) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::already_exists(format!(
                "table {}",
                payload.number
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let table = Table::new(
                    Uuid::new_v4().to_string(),
                    payload.number,
                    capacity,
                    Utc::now(),
                );
                entry.insert(table.clone());
                info!(number = payload.number, capacity, "Table registered");
                Ok(table)
            }
        }
    }

    /// Remove a table; refused while it is occupied
    pub fn remove(&self, number: u32) -> AppResult<()> {
        if self
            .tables
            .remove_if(&number, |_, table| !table.is_occupied())
            .is_some()
        {
            info!(number, "Table removed");
            return Ok(());
        }
        match self.tables.get(&number) {
            Some(_) => Err(AppError::with_message(
                ErrorCode::TableOccupied,
                format!("table {} cannot be removed while occupied", number),
            )),
            None => Err(AppError::not_found(format!("table {}", number))),
        }
    }

    // ==================== State machine ====================

    /// Occupy an available table, enforcing the capacity limit
    pub fn occupy(&self, number: u32, payload: TableOccupy) -> AppResult<Table> {
        self.occupy_inner(number, payload, true)
    }

    /// Occupy ignoring the capacity limit (joined tables); the state
    /// check still applies
    pub fn occupy_override(&self, number: u32, payload: TableOccupy) -> AppResult<Table> {
        self.occupy_inner(number, payload, false)
    }

    fn occupy_inner(
        &self,
        number: u32,
        payload: TableOccupy,
        enforce_capacity: bool,
    ) -> AppResult<Table> {
        payload.validate()?;
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;

        if !table.is_available() {
            return Err(AppError::with_message(
                ErrorCode::TableNotAvailable,
                format!("table {} is not available", number),
            )
            .with_detail("status", format!("{:?}", table.status)));
        }
        if enforce_capacity && payload.party_size > table.capacity {
            return Err(AppError::with_message(
                ErrorCode::CapacityExceeded,
                format!(
                    "table {} seats {}, party of {} requested",
                    number, table.capacity, payload.party_size
                ),
            )
            .with_detail("capacity", table.capacity)
            .with_detail("party_size", payload.party_size));
        }

        table.occupy(payload.party_size, payload.server_name, Utc::now());
        info!(
            number,
            party_size = table.party_size,
            server = table.server_name.as_deref().unwrap_or_default(),
            "Table occupied"
        );
        Ok(table.clone())
    }

    /// Release a table unconditionally, recording the reason
    ///
    /// No open-order guard lives here; `OrderService::release_table` is
    /// the caller-facing path that surfaces unfinished orders first.
    pub fn release(&self, number: u32, reason: Option<String>) -> AppResult<Table> {
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        table.release(reason, Utc::now());
        info!(number, "Table released");
        Ok(table.clone())
    }

    /// Reserve a table; only allowed from AVAILABLE
    pub fn reserve(&self, number: u32) -> AppResult<Table> {
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        if !table.is_available() {
            return Err(AppError::with_message(
                ErrorCode::TableNotAvailable,
                format!("table {} cannot be reserved", number),
            )
            .with_detail("status", format!("{:?}", table.status)));
        }
        table.reserve(Utc::now());
        info!(number, "Table reserved");
        Ok(table.clone())
    }

    // ==================== Consumption total ====================

    /// Overwrite the running consumption total
    pub fn update_consumption_total(&self, number: u32, total: Decimal) -> AppResult<Table> {
        money::require_non_negative(total, "consumption total")?;
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        table.consumption_total = money::round_money(total);
        table.updated_at = Utc::now();
        Ok(table.clone())
    }

    /// Subtract from the running total, clamping at zero
    pub(crate) fn subtract_from_total(&self, number: u32, amount: Decimal) -> AppResult<Decimal> {
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        let next = table.consumption_total - amount;
        if next < Decimal::ZERO {
            warn!(
                number,
                current = %table.consumption_total,
                subtract = %amount,
                "Consumption total clamped at zero"
            );
        }
        table.consumption_total = next.max(Decimal::ZERO);
        table.updated_at = Utc::now();
        Ok(table.consumption_total)
    }

    /// Run `f` against the table while holding its entry guard, requiring
    /// OCCUPIED state. The order service uses this to make
    /// order-insert + total-update one atomic pair.
    pub(crate) fn with_occupied<T>(
        &self,
        number: u32,
        f: impl FnOnce(&mut Table) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        if !table.is_occupied() {
            return Err(AppError::with_message(
                ErrorCode::TableNotOccupied,
                format!("table {} is not occupied", number),
            )
            .with_detail("status", format!("{:?}", table.status)));
        }
        f(&mut table)
    }

    /// Run `f` while holding the table's entry guard, regardless of state
    pub(crate) fn with_table<T>(
        &self,
        number: u32,
        f: impl FnOnce(&mut Table) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut table = self
            .tables
            .get_mut(&number)
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))?;
        f(&mut table)
    }

    // ==================== Queries ====================

    pub fn get(&self, number: u32) -> AppResult<Table> {
        self.tables
            .get(&number)
            .map(|t| t.clone())
            .ok_or_else(|| AppError::not_found(format!("table {}", number)))
    }

    pub fn list(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.tables.iter().map(|t| t.clone()).collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    pub fn list_by_status(&self, status: TableStatus) -> Vec<Table> {
        let mut tables: Vec<Table> = self
            .tables
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    pub fn list_available(&self) -> Vec<Table> {
        self.list_by_status(TableStatus::Available)
    }

    pub fn list_occupied(&self) -> Vec<Table> {
        self.list_by_status(TableStatus::Occupied)
    }

    /// Occupied tables assigned to a server (case-insensitive)
    pub fn list_by_server(&self, server_name: &str) -> Vec<Table> {
        let mut tables: Vec<Table> = self
            .tables
            .iter()
            .filter(|t| {
                t.server_name
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(server_name))
            })
            .map(|t| t.clone())
            .collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    pub fn counts(&self) -> TableCounts {
        let mut counts = TableCounts::default();
        for table in self.tables.iter() {
            match table.status {
                TableStatus::Available => counts.available += 1,
                TableStatus::Occupied => counts.occupied += 1,
                TableStatus::Reserved => counts.reserved += 1,
            }
        }
        counts
    }
}
