//! Order model
//!
//! Line prices are snapshots taken at order time; later catalog changes
//! never alter a recorded order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Order status
///
/// Forward chain: PENDING → PREPARING → READY → SERVED → PAID, with
/// VOIDED reachable from any non-terminal state. PAID and VOIDED are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
    Paid,
    Voided,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Voided)
    }

    /// Whether the guarded state machine allows advancing to `target`
    ///
    /// Only the single next step of the kitchen chain is allowed; PAID is
    /// reached through payment collection and VOIDED through voiding, not
    /// through this check.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Pending, OrderStatus::Preparing)
                | (OrderStatus::Preparing, OrderStatus::Ready)
                | (OrderStatus::Ready, OrderStatus::Served)
        )
    }
}

/// Void metadata, set exactly once when an order is voided
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidInfo {
    pub reason: String,
    pub voided_by: String,
    pub voided_at: DateTime<Utc>,
}

/// Order line - product snapshot at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Catalog product id, when known (used for recipe deduction)
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// quantity × unit_price, rounded to cents
    pub subtotal: Decimal,
    pub note: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-facing generated code (`PED…`)
    pub code: String,
    pub table_number: u32,
    pub server_name: String,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// subtotal − discount
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_info: Option<VoidInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_voided(&self) -> bool {
        self.status == OrderStatus::Voided
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    /// Non-terminal orders still moving through the kitchen chain
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Orders that payment collection settles: anything not yet paid and
    /// not voided
    pub fn is_collectible(&self) -> bool {
        !self.is_paid() && !self.is_voided()
    }
}

/// Order line input payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineInput {
    pub product_id: Option<String>,
    #[validate(length(min = 1, message = "product name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub note: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderCreate {
    pub table_number: u32,
    #[validate(length(min = 1, message = "server name is required"))]
    pub server_name: String,
    pub note: Option<String>,
    #[validate(length(min = 1, message = "an order needs at least one line"), nested)]
    pub lines: Vec<OrderLineInput>,
}
