//! Cash till model
//!
//! One cash session per accounting period; movements are append-only and
//! sessions become immutable after close.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Open,
    Closed,
}

/// Payment method for sale movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    /// Mobile wallet (Yape)
    Yape,
    /// Mobile wallet (Plin)
    Plin,
    Card,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Yape => "yape",
            PaymentMethod::Plin => "plin",
            PaymentMethod::Card => "card",
        }
    }
}

/// Movement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Sale,
    Expense,
}

/// A single recorded sale or expense within a session. Immutable once
/// created; expense amounts are stored positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub session_id: String,
    pub kind: MovementKind,
    pub description: String,
    pub amount: Decimal,
    /// Sales only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    /// Amount tendered by the customer (cash sales)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendered: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

/// Cash session ("till") entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashSession {
    pub id: String,
    /// Human-facing generated code (`CAJA…`)
    pub code: String,
    pub status: SessionStatus,
    pub responsible: String,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_float: Decimal,
    /// Physically counted amount, set at close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_count: Option<Decimal>,
    pub total_sales: Decimal,
    pub total_cash: Decimal,
    pub total_yape: Decimal,
    pub total_plin: Decimal,
    pub total_card: Decimal,
    pub total_expenses: Decimal,
    /// closing_count − (opening_float + total_cash − total_expenses),
    /// set at close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<Decimal>,
}

impl CashSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Expected cash in drawer: opening float + cash sales − expenses
    pub fn expected_cash(&self) -> Decimal {
        self.opening_float + self.total_cash - self.total_expenses
    }

    /// Add a sale amount to the overall and per-method totals
    pub fn apply_sale(&mut self, amount: Decimal, method: PaymentMethod) {
        self.total_sales += amount;
        match method {
            PaymentMethod::Cash => self.total_cash += amount,
            PaymentMethod::Yape => self.total_yape += amount,
            PaymentMethod::Plin => self.total_plin += amount,
            PaymentMethod::Card => self.total_card += amount,
        }
    }

    pub fn apply_expense(&mut self, amount: Decimal) {
        self.total_expenses += amount;
    }
}

/// Open session payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionOpen {
    pub opening_float: Decimal,
    #[validate(length(min = 1, message = "responsible is required"))]
    pub responsible: String,
}

/// Record sale payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaleInput {
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    pub tendered: Option<Decimal>,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "recorded_by is required"))]
    pub recorded_by: String,
}

/// Record expense payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseInput {
    #[validate(length(min = 1, message = "concept is required"))]
    pub concept: String,
    pub amount: Decimal,
    #[validate(length(min = 1, message = "recorded_by is required"))]
    pub recorded_by: String,
}

/// Close session payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionClose {
    pub counted_amount: Decimal,
    #[validate(length(min = 1, message = "responsible is required"))]
    pub responsible: String,
}
