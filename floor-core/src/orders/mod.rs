//! Order service
//!
//! The order aggregate and its ties to the rest of the floor: creation
//! against an occupied table, the guarded kitchen chain, voiding, and
//! payment collection which settles a whole table into the open till and
//! deducts recipe ingredients.
//!
//! Lock order is fixed across the crate: table entry before order entry.
//! Creation and voiding hold the table guard across the order mutation
//! and the total update so the pair is atomic.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{
    DeductionSummary, Movement, Order, OrderCreate, OrderLine, OrderStatus, PaymentMethod, Table,
    VoidInfo,
};
use shared::{AppError, AppResult, ErrorCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::inventory::RecipeEngine;
use crate::money;
use crate::tables::TableRegistry;
use crate::till::CashTill;

/// Outcome of collecting a table's payment
#[derive(Debug, Clone, Serialize)]
pub struct CollectOutcome {
    /// Orders settled by this collection
    pub orders: Vec<Order>,
    /// Sale movements posted to the till, one per order
    pub movements: Vec<Movement>,
    /// Recipe deductions triggered by the sale
    pub deduction: DeductionSummary,
}

/// Daily dashboard counters
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_today: usize,
    pub pending: usize,
    pub preparing: usize,
    pub ready: usize,
    pub served: usize,
    pub paid_today: usize,
    pub voided_today: usize,
    pub sales_today: Decimal,
}

/// Order service
pub struct OrderService {
    orders: DashMap<String, Order>,
    order_counter: AtomicU64,
    tz: Tz,
    tables: Arc<TableRegistry>,
    till: Arc<CashTill>,
    recipes: Arc<RecipeEngine>,
}

impl OrderService {
    pub fn new(
        tz: Tz,
        tables: Arc<TableRegistry>,
        till: Arc<CashTill>,
        recipes: Arc<RecipeEngine>,
    ) -> Self {
        Self {
            orders: DashMap::new(),
            order_counter: AtomicU64::new(0),
            tz,
            tables,
            till,
            recipes,
        }
    }

    fn next_code(&self) -> String {
        let count = self.order_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let date_str = Utc::now().with_timezone(&self.tz).format("%Y%m%d").to_string();
        format!("PED{}{}", date_str, 1000 + count)
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    // ==================== Creation ====================

    /// Create an order against an occupied table
    ///
    /// Line prices are caller-supplied snapshots (priced from the
    /// external catalog); the service only derives subtotals. The order
    /// insert and the table-total update happen under the table's guard.
    pub fn create(&self, payload: OrderCreate) -> AppResult<Order> {
        payload.validate()?;

        let mut lines = Vec::with_capacity(payload.lines.len());
        let mut subtotal = Decimal::ZERO;
        for input in payload.lines {
            money::require_non_negative(input.unit_price, "unit price")?;
            let line_subtotal = money::line_subtotal(input.unit_price, input.quantity);
            subtotal += line_subtotal;
            lines.push(OrderLine {
                product_id: input.product_id,
                name: input.name,
                quantity: input.quantity,
                unit_price: input.unit_price,
                subtotal: line_subtotal,
                note: input.note,
            });
        }
        subtotal = money::round_money(subtotal);

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            code: self.next_code(),
            table_number: payload.table_number,
            server_name: payload.server_name,
            note: payload.note,
            status: OrderStatus::Pending,
            lines,
            subtotal,
            discount: Decimal::ZERO,
            total: subtotal,
            void_info: None,
            created_at: now,
            updated_at: now,
        };

        self.tables.with_occupied(payload.table_number, |table| {
            table.consumption_total = money::round_money(table.consumption_total + order.total);
            table.updated_at = now;
            self.orders.insert(order.id.clone(), order.clone());
            Ok(())
        })?;

        info!(
            code = %order.code,
            table = order.table_number,
            total = %order.total,
            "Order created"
        );
        Ok(order)
    }

    // ==================== State transitions ====================

    /// Advance an order one step along the kitchen chain
    /// (PENDING → PREPARING → READY → SERVED)
    pub fn advance_state(&self, order_id: &str, target: OrderStatus) -> AppResult<Order> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))?;

        Self::ensure_not_terminal(&order)?;
        if !order.status.can_advance_to(target) {
            return Err(AppError::with_message(
                ErrorCode::InvalidTransition,
                format!("cannot advance from {:?} to {:?}", order.status, target),
            )
            .with_detail("from", format!("{:?}", order.status))
            .with_detail("to", format!("{:?}", target)));
        }
        order.status = target;
        order.updated_at = Utc::now();
        info!(code = %order.code, status = ?order.status, "Order advanced");
        Ok(order.clone())
    }

    /// Force an order into any non-terminal state, bypassing the chain
    ///
    /// The escape hatch for exceptional floor situations. Voiding and
    /// payment keep their dedicated operations; terminal states cannot
    /// be entered or left here.
    pub fn override_state(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &str,
    ) -> AppResult<Order> {
        if target.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::InvalidTransition,
                "terminal states are set through void_order / collect_payment",
            ));
        }
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))?;
        Self::ensure_not_terminal(&order)?;

        warn!(
            code = %order.code,
            from = ?order.status,
            to = ?target,
            actor,
            "Order state overridden"
        );
        order.status = target;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    fn ensure_not_terminal(order: &Order) -> AppResult<()> {
        match order.status {
            OrderStatus::Paid => Err(AppError::with_message(
                ErrorCode::OrderAlreadyPaid,
                format!("order {} is already paid", order.code),
            )
            .with_detail("code", order.code.clone())),
            OrderStatus::Voided => Err(AppError::with_message(
                ErrorCode::OrderAlreadyVoided,
                format!("order {} is already voided", order.code),
            )
            .with_detail("code", order.code.clone())),
            _ => Ok(()),
        }
    }

    // ==================== Discount ====================

    /// Set the order discount, re-deriving total = subtotal − discount
    /// and propagating the delta to the table's running total
    pub fn set_discount(&self, order_id: &str, discount: Decimal) -> AppResult<Order> {
        money::require_non_negative(discount, "discount")?;
        let table_number = self.get(order_id)?.table_number;

        self.tables.with_table(table_number, |table| {
            let mut order = self
                .orders
                .get_mut(order_id)
                .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))?;
            Self::ensure_not_terminal(&order)?;

            let discount = money::round_money(discount);
            if discount > order.subtotal {
                return Err(AppError::out_of_range(format!(
                    "discount {} exceeds subtotal {}",
                    discount, order.subtotal
                )));
            }

            let old_total = order.total;
            order.discount = discount;
            order.total = money::round_money(order.subtotal - discount);
            order.updated_at = Utc::now();

            let delta = order.total - old_total;
            table.consumption_total =
                money::round_money((table.consumption_total + delta).max(Decimal::ZERO));
            table.updated_at = order.updated_at;
            Ok(order.clone())
        })
    }

    // ==================== Voiding ====================

    /// Void an order, recording reason and actor, and subtract its total
    /// from the table's running total (clamped at zero)
    pub fn void_order(&self, order_id: &str, reason: &str, actor: &str) -> AppResult<Order> {
        if reason.trim().is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "a void reason is required",
            ));
        }
        if actor.trim().is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "the voiding actor is required",
            ));
        }

        let table_number = self.get(order_id)?.table_number;
        let voided = self.tables.with_table(table_number, |table| {
            let mut order = self
                .orders
                .get_mut(order_id)
                .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))?;
            Self::ensure_not_terminal(&order)?;

            let now = Utc::now();
            order.status = OrderStatus::Voided;
            order.void_info = Some(VoidInfo {
                reason: reason.trim().to_string(),
                voided_by: actor.to_string(),
                voided_at: now,
            });
            order.updated_at = now;

            table.consumption_total =
                money::round_money((table.consumption_total - order.total).max(Decimal::ZERO));
            table.updated_at = now;
            Ok(order.clone())
        })?;

        info!(code = %voided.code, actor, reason, "Order voided");
        Ok(voided)
    }

    // ==================== Payment collection ====================

    /// Collect payment for every collectible order on a table
    ///
    /// Each settled order posts one sale movement to the open till
    /// (defaulting to cash) and the collected lines drive recipe
    /// deduction. Fails before touching any order when no session is
    /// open. If the till closes mid-collection the error reports how
    /// many orders were already settled; nothing is rolled back.
    pub fn collect_payment(
        &self,
        table_number: u32,
        method: Option<PaymentMethod>,
        recorded_by: &str,
    ) -> AppResult<CollectOutcome> {
        if !self.till.is_open() {
            return Err(AppError::with_message(
                ErrorCode::NoOpenSession,
                "open a cash session before collecting payments",
            ));
        }
        let method = method.unwrap_or_default();

        let mut candidates: Vec<String> = self
            .orders
            .iter()
            .filter(|o| o.table_number == table_number && o.is_collectible())
            .map(|o| o.id.clone())
            .collect();
        candidates.sort();

        let mut outcome = CollectOutcome {
            orders: Vec::new(),
            movements: Vec::new(),
            deduction: DeductionSummary::default(),
        };

        for order_id in candidates {
            let paid = {
                let mut order = match self.orders.get_mut(&order_id) {
                    Some(order) => order,
                    None => continue,
                };
                if !order.is_collectible() {
                    continue;
                }
                order.status = OrderStatus::Paid;
                order.updated_at = Utc::now();
                order.clone()
            };

            let movement = self
                .till
                .record_sale(shared::models::SaleInput {
                    amount: paid.total,
                    method,
                    tendered: None,
                    description: Some(format!("Table {} ({})", table_number, paid.code)),
                    recorded_by: recorded_by.to_string(),
                })
                .map_err(|e| {
                    e.with_detail("settled_orders", outcome.orders.len() as u64 + 1)
                        .with_detail("last_settled_code", paid.code.clone())
                })?;

            outcome.movements.push(movement);
            outcome.orders.push(paid);
        }

        let sold: Vec<(String, i32)> = outcome
            .orders
            .iter()
            .flat_map(|o| o.lines.iter())
            .filter_map(|l| l.product_id.clone().map(|id| (id, l.quantity)))
            .collect();
        outcome.deduction = self.recipes.deduct_for_order(&sold)?;

        info!(
            table = table_number,
            orders = outcome.orders.len(),
            method = method.label(),
            "Table payment collected"
        );
        Ok(outcome)
    }

    // ==================== Table release ====================

    /// Release a table through the order service, surfacing unfinished
    /// orders instead of hiding them
    pub fn release_table(&self, table_number: u32, reason: Option<String>) -> AppResult<Table> {
        let active = self.active_for_table(table_number).len();
        if active > 0 {
            warn!(
                table = table_number,
                active_orders = active,
                "Releasing table with unfinished orders"
            );
        }
        self.tables.release(table_number, reason)
    }

    // ==================== Queries ====================

    pub fn get(&self, order_id: &str) -> AppResult<Order> {
        self.orders
            .get(order_id)
            .map(|o| o.clone())
            .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))
    }

    pub fn get_by_code(&self, code: &str) -> AppResult<Order> {
        self.orders
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.clone())
            .ok_or_else(|| AppError::not_found(format!("order {}", code)))
    }

    /// All orders of a table, newest first
    pub fn list_by_table(&self, table_number: u32) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.table_number == table_number)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Non-terminal orders of a table
    pub fn active_for_table(&self, table_number: u32) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.table_number == table_number && o.is_active())
            .map(|o| o.clone())
            .collect()
    }

    /// All of today's orders (business timezone), newest first
    pub fn orders_today(&self) -> Vec<Order> {
        let today = self.today();
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.created_at.with_timezone(&self.tz).date_naive() == today)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Voided orders, optionally filtered by void date range and/or actor
    pub fn voided(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
        actor: Option<&str>,
    ) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| {
                let Some(info) = &o.void_info else {
                    return false;
                };
                if let Some((from, to)) = range {
                    let date = info.voided_at.with_timezone(&self.tz).date_naive();
                    if date < from || date > to {
                        return false;
                    }
                }
                if let Some(actor) = actor {
                    if !info.voided_by.eq_ignore_ascii_case(actor) {
                        return false;
                    }
                }
                true
            })
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        orders
    }

    /// Orders paid today (business timezone)
    pub fn paid_today(&self) -> Vec<Order> {
        let today = self.today();
        self.orders
            .iter()
            .filter(|o| {
                o.is_paid() && o.updated_at.with_timezone(&self.tz).date_naive() == today
            })
            .map(|o| o.clone())
            .collect()
    }

    pub fn stats_today(&self) -> OrderStats {
        let today = self.today();
        let mut stats = OrderStats {
            total_today: 0,
            pending: 0,
            preparing: 0,
            ready: 0,
            served: 0,
            paid_today: 0,
            voided_today: 0,
            sales_today: Decimal::ZERO,
        };
        for order in self.orders.iter() {
            let created_today = order.created_at.with_timezone(&self.tz).date_naive() == today;
            if created_today {
                stats.total_today += 1;
            }
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Preparing => stats.preparing += 1,
                OrderStatus::Ready => stats.ready += 1,
                OrderStatus::Served => stats.served += 1,
                OrderStatus::Paid if created_today => {
                    stats.paid_today += 1;
                    stats.sales_today += order.total;
                }
                OrderStatus::Voided if created_today => stats.voided_today += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests;
