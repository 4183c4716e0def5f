//! Cash till
//!
//! One physical register, at most one open session system-wide. The
//! open-session check and session creation share a single critical
//! section, so two concurrent openers cannot both succeed. Movements are
//! append-only; a closed session and its movements are immutable.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{
    CashSession, ExpenseInput, Movement, MovementKind, SaleInput, SessionClose, SessionOpen,
    SessionStatus,
};
use shared::{AppError, AppResult, ErrorCode};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::money;

/// A closed session together with its movement ledger
#[derive(Debug, Clone, Serialize)]
pub struct ClosedSession {
    pub session: CashSession,
    pub movements: Vec<Movement>,
}

/// Snapshot of the current register state
#[derive(Debug, Clone, Serialize)]
pub struct TillStats {
    pub is_open: bool,
    pub total_sales: Decimal,
    pub total_cash: Decimal,
    pub total_yape: Decimal,
    pub total_plin: Decimal,
    pub total_card: Decimal,
    pub total_expenses: Decimal,
    pub movement_count: usize,
}

#[derive(Debug, Default)]
struct TillInner {
    current: Option<CashSession>,
    current_movements: Vec<Movement>,
    history: Vec<ClosedSession>,
}

/// The cash register
#[derive(Debug)]
pub struct CashTill {
    inner: Mutex<TillInner>,
    session_counter: AtomicU64,
    tz: Tz,
}

impl CashTill {
    pub fn new(tz: Tz) -> Self {
        Self {
            inner: Mutex::new(TillInner::default()),
            session_counter: AtomicU64::new(0),
            tz,
        }
    }

    fn next_session_code(&self) -> String {
        let count = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let date_str = Utc::now().with_timezone(&self.tz).format("%Y%m%d").to_string();
        format!("CAJA{}{}", date_str, 100 + count)
    }

    // ==================== Lifecycle ====================

    /// Open a new session; fails while another session is open
    pub fn open_session(&self, payload: SessionOpen) -> AppResult<CashSession> {
        payload.validate()?;
        money::require_non_negative(payload.opening_float, "opening float")?;

        let mut inner = self.inner.lock();
        if let Some(open) = &inner.current {
            return Err(AppError::with_message(
                ErrorCode::SessionAlreadyOpen,
                "a cash session is already open; close it before opening another",
            )
            .with_detail("open_session_code", open.code.clone()));
        }

        let session = CashSession {
            id: Uuid::new_v4().to_string(),
            code: self.next_session_code(),
            status: SessionStatus::Open,
            responsible: payload.responsible,
            opened_at: Utc::now(),
            closed_at: None,
            opening_float: money::round_money(payload.opening_float),
            closing_count: None,
            total_sales: Decimal::ZERO,
            total_cash: Decimal::ZERO,
            total_yape: Decimal::ZERO,
            total_plin: Decimal::ZERO,
            total_card: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            difference: None,
        };
        info!(
            code = %session.code,
            opening_float = %session.opening_float,
            responsible = %session.responsible,
            "Cash session opened"
        );
        inner.current = Some(session.clone());
        inner.current_movements.clear();
        Ok(session)
    }

    /// Close the open session, reconciling the counted amount
    ///
    /// expected = opening float + cash sales − expenses;
    /// difference = counted − expected.
    pub fn close_session(&self, payload: SessionClose) -> AppResult<CashSession> {
        payload.validate()?;
        money::require_non_negative(payload.counted_amount, "counted amount")?;

        let mut inner = self.inner.lock();
        let mut session = inner
            .current
            .take()
            .ok_or_else(|| AppError::new(ErrorCode::NoOpenSession))?;

        let counted = money::round_money(payload.counted_amount);
        let expected = session.expected_cash();
        session.status = SessionStatus::Closed;
        session.closed_at = Some(Utc::now());
        session.closing_count = Some(counted);
        session.difference = Some(counted - expected);
        session.responsible = payload.responsible;

        info!(
            code = %session.code,
            expected = %expected,
            counted = %counted,
            difference = %(counted - expected),
            "Cash session closed"
        );

        let movements = std::mem::take(&mut inner.current_movements);
        inner.history.push(ClosedSession {
            session: session.clone(),
            movements,
        });
        Ok(session)
    }

    // ==================== Movements ====================

    /// Record a sale against the open session
    pub fn record_sale(&self, payload: SaleInput) -> AppResult<Movement> {
        payload.validate()?;
        money::require_positive(payload.amount, "sale amount")?;
        let amount = money::round_money(payload.amount);

        let change = match payload.tendered {
            Some(tendered) => {
                money::require_non_negative(tendered, "tendered amount")?;
                let tendered = money::round_money(tendered);
                if tendered < amount {
                    return Err(AppError::validation(format!(
                        "tendered {} is less than the sale amount {}",
                        tendered, amount
                    )));
                }
                Some(tendered - amount)
            }
            None => None,
        };

        let mut inner = self.inner.lock();
        let session = inner
            .current
            .as_mut()
            .ok_or_else(|| AppError::new(ErrorCode::NoOpenSession))?;

        session.apply_sale(amount, payload.method);
        let movement = Movement {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            kind: MovementKind::Sale,
            description: payload.description.unwrap_or_else(|| "Sale".to_string()),
            amount,
            method: Some(payload.method),
            tendered: payload.tendered.map(money::round_money),
            change,
            recorded_by: payload.recorded_by,
            recorded_at: Utc::now(),
        };
        info!(
            session = %session.code,
            amount = %amount,
            method = payload.method.label(),
            "Sale recorded"
        );
        inner.current_movements.push(movement.clone());
        Ok(movement)
    }

    /// Record an expense against the open session; the amount is stored
    /// positive and tracked separately from sales
    pub fn record_expense(&self, payload: ExpenseInput) -> AppResult<Movement> {
        payload.validate()?;
        money::require_positive(payload.amount, "expense amount")?;
        let amount = money::round_money(payload.amount);

        let mut inner = self.inner.lock();
        let session = inner
            .current
            .as_mut()
            .ok_or_else(|| AppError::new(ErrorCode::NoOpenSession))?;

        session.apply_expense(amount);
        let movement = Movement {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            kind: MovementKind::Expense,
            description: payload.concept,
            amount,
            method: None,
            tendered: None,
            change: None,
            recorded_by: payload.recorded_by,
            recorded_at: Utc::now(),
        };
        info!(session = %session.code, amount = %amount, "Expense recorded");
        inner.current_movements.push(movement.clone());
        Ok(movement)
    }

    // ==================== Queries ====================

    /// The open session, if any
    pub fn current(&self) -> Option<CashSession> {
        self.inner.lock().current.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().current.is_some()
    }

    /// Movements of the open session, most recent first
    pub fn current_movements(&self) -> Vec<Movement> {
        let inner = self.inner.lock();
        inner.current_movements.iter().rev().cloned().collect()
    }

    /// Closed sessions with their ledgers, most recent first
    pub fn history(&self) -> Vec<ClosedSession> {
        let inner = self.inner.lock();
        inner.history.iter().rev().cloned().collect()
    }

    /// Closed sessions only, most recent first
    pub fn closed_sessions(&self) -> Vec<CashSession> {
        let inner = self.inner.lock();
        inner
            .history
            .iter()
            .rev()
            .map(|c| c.session.clone())
            .collect()
    }

    /// Sessions opened on a business day (configured timezone), the open
    /// one included
    pub fn sessions_for_day(&self, date: NaiveDate) -> Vec<CashSession> {
        let inner = self.inner.lock();
        inner
            .history
            .iter()
            .map(|c| &c.session)
            .chain(inner.current.as_ref())
            .filter(|s| s.opened_at.with_timezone(&self.tz).date_naive() == date)
            .cloned()
            .collect()
    }

    /// Total sales across all sessions opened on a business day
    pub fn sales_total_for_day(&self, date: NaiveDate) -> Decimal {
        self.sessions_for_day(date)
            .iter()
            .map(|s| s.total_sales)
            .sum()
    }

    pub fn stats(&self) -> TillStats {
        let inner = self.inner.lock();
        match &inner.current {
            Some(session) => TillStats {
                is_open: true,
                total_sales: session.total_sales,
                total_cash: session.total_cash,
                total_yape: session.total_yape,
                total_plin: session.total_plin,
                total_card: session.total_card,
                total_expenses: session.total_expenses,
                movement_count: inner.current_movements.len(),
            },
            None => TillStats {
                is_open: false,
                total_sales: Decimal::ZERO,
                total_cash: Decimal::ZERO,
                total_yape: Decimal::ZERO,
                total_plin: Decimal::ZERO,
                total_card: Decimal::ZERO,
                total_expenses: Decimal::ZERO,
                movement_count: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentMethod;

    fn till() -> CashTill {
        CashTill::new(chrono_tz::America::Lima)
    }

    fn open(till: &CashTill, float: i64) -> CashSession {
        till.open_session(SessionOpen {
            opening_float: Decimal::from(float),
            responsible: "Maria".to_string(),
        })
        .unwrap()
    }

    fn sale(amount: i64, method: PaymentMethod) -> SaleInput {
        SaleInput {
            amount: Decimal::from(amount),
            method,
            tendered: None,
            description: None,
            recorded_by: "Maria".to_string(),
        }
    }

    #[test]
    fn test_second_open_rejected() {
        let till = till();
        let first = open(&till, 100);

        let result = till.open_session(SessionOpen {
            opening_float: Decimal::from(50),
            responsible: "Jose".to_string(),
        });
        assert!(matches!(result, Err(e) if e.code == ErrorCode::SessionAlreadyOpen));

        // the original session is untouched
        let current = till.current().unwrap();
        assert_eq!(current.code, first.code);
        assert_eq!(current.opening_float, Decimal::from(100));
    }

    #[test]
    fn test_movements_require_open_session() {
        let till = till();
        assert!(matches!(
            till.record_sale(sale(10, PaymentMethod::Cash)),
            Err(e) if e.code == ErrorCode::NoOpenSession
        ));
        assert!(matches!(
            till.record_expense(ExpenseInput {
                concept: "ice".to_string(),
                amount: Decimal::from(5),
                recorded_by: "Maria".to_string(),
            }),
            Err(e) if e.code == ErrorCode::NoOpenSession
        ));
    }

    #[test]
    fn test_reconciliation_balances() {
        // float 100, cash sale 35, expense 5 → expected 130, difference 0
        let till = till();
        open(&till, 100);
        till.record_sale(sale(35, PaymentMethod::Cash)).unwrap();
        till.record_expense(ExpenseInput {
            concept: "ice".to_string(),
            amount: Decimal::from(5),
            recorded_by: "Maria".to_string(),
        })
        .unwrap();

        let closed = till
            .close_session(SessionClose {
                counted_amount: Decimal::from(130),
                responsible: "Maria".to_string(),
            })
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.difference, Some(Decimal::ZERO));
        assert_eq!(closed.total_sales, Decimal::from(35));
        assert_eq!(closed.total_expenses, Decimal::from(5));
        assert!(till.current().is_none());
    }

    #[test]
    fn test_difference_reports_shortage() {
        let till = till();
        open(&till, 100);
        till.record_sale(sale(40, PaymentMethod::Cash)).unwrap();

        let closed = till
            .close_session(SessionClose {
                counted_amount: Decimal::from(135),
                responsible: "Maria".to_string(),
            })
            .unwrap();
        assert_eq!(closed.difference, Some(Decimal::from(-5)));
    }

    #[test]
    fn test_per_method_totals_and_expected_cash() {
        let till = till();
        open(&till, 50);
        till.record_sale(sale(20, PaymentMethod::Cash)).unwrap();
        till.record_sale(sale(30, PaymentMethod::Yape)).unwrap();
        till.record_sale(sale(15, PaymentMethod::Card)).unwrap();

        let stats = till.stats();
        assert_eq!(stats.total_sales, Decimal::from(65));
        assert_eq!(stats.total_cash, Decimal::from(20));
        assert_eq!(stats.total_yape, Decimal::from(30));
        assert_eq!(stats.total_card, Decimal::from(15));

        // only cash enters the drawer
        let closed = till
            .close_session(SessionClose {
                counted_amount: Decimal::from(70),
                responsible: "Maria".to_string(),
            })
            .unwrap();
        assert_eq!(closed.difference, Some(Decimal::ZERO));
    }

    #[test]
    fn test_change_computed_from_tendered() {
        let till = till();
        open(&till, 0);
        let movement = till
            .record_sale(SaleInput {
                amount: Decimal::new(3550, 2),
                method: PaymentMethod::Cash,
                tendered: Some(Decimal::from(50)),
                description: Some("Table 5".to_string()),
                recorded_by: "Maria".to_string(),
            })
            .unwrap();
        assert_eq!(movement.change, Some(Decimal::new(1450, 2)));

        let short = till.record_sale(SaleInput {
            amount: Decimal::from(20),
            method: PaymentMethod::Cash,
            tendered: Some(Decimal::from(10)),
            description: None,
            recorded_by: "Maria".to_string(),
        });
        assert!(matches!(short, Err(e) if e.code == ErrorCode::ValidationFailed));
    }

    #[test]
    fn test_movements_most_recent_first() {
        let till = till();
        open(&till, 0);
        till.record_sale(sale(10, PaymentMethod::Cash)).unwrap();
        till.record_sale(sale(20, PaymentMethod::Cash)).unwrap();

        let movements = till.current_movements();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].amount, Decimal::from(20));
        assert_eq!(movements[1].amount, Decimal::from(10));
    }

    #[test]
    fn test_concurrent_openers_race_to_one_session() {
        use std::sync::Arc;

        let till = Arc::new(till());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let till = till.clone();
                std::thread::spawn(move || {
                    till.open_session(SessionOpen {
                        opening_float: Decimal::from(i),
                        responsible: format!("opener-{}", i),
                    })
                    .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert!(till.current().is_some());
    }

    #[test]
    fn test_day_sales_across_sessions() {
        let till = till();
        open(&till, 100);
        till.record_sale(sale(35, PaymentMethod::Cash)).unwrap();
        till.close_session(SessionClose {
            counted_amount: Decimal::from(135),
            responsible: "Maria".to_string(),
        })
        .unwrap();

        open(&till, 100);
        till.record_sale(sale(15, PaymentMethod::Card)).unwrap();

        let today = Utc::now()
            .with_timezone(&chrono_tz::America::Lima)
            .date_naive();
        assert_eq!(till.sales_total_for_day(today), Decimal::from(50));
        assert_eq!(till.sessions_for_day(today).len(), 2);
    }
}
