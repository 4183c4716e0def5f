//! Dining table model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Table status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
}

/// Dining table entity
///
/// The table number is the public identity and never changes; the running
/// consumption total mirrors the sum of the table's non-voided orders and
/// is reset to zero exactly on release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    /// Public table number (unique, immutable)
    pub number: u32,
    pub capacity: i32,
    pub status: TableStatus,
    /// Assigned server display name, set while occupied
    pub server_name: Option<String>,
    pub party_size: i32,
    pub occupied_since: Option<DateTime<Utc>>,
    /// Running consumption total (non-negative)
    pub consumption_total: Decimal,
    /// Reason recorded on the most recent release
    pub release_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(id: String, number: u32, capacity: i32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            number,
            capacity,
            status: TableStatus::Available,
            server_name: None,
            party_size: 0,
            occupied_since: None,
            consumption_total: Decimal::ZERO,
            release_reason: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == TableStatus::Available
    }

    pub fn is_occupied(&self) -> bool {
        self.status == TableStatus::Occupied
    }

    /// Transition to OCCUPIED, stamping the occupancy time and resetting
    /// the consumption total
    pub fn occupy(&mut self, party_size: i32, server_name: String, now: DateTime<Utc>) {
        self.status = TableStatus::Occupied;
        self.party_size = party_size;
        self.server_name = Some(server_name);
        self.occupied_since = Some(now);
        self.consumption_total = Decimal::ZERO;
        self.release_reason = None;
        self.updated_at = now;
    }

    /// Transition to AVAILABLE, clearing occupancy data and resetting the
    /// consumption total
    pub fn release(&mut self, reason: Option<String>, now: DateTime<Utc>) {
        self.status = TableStatus::Available;
        self.party_size = 0;
        self.server_name = None;
        self.occupied_since = None;
        self.consumption_total = Decimal::ZERO;
        self.release_reason = reason;
        self.updated_at = now;
    }

    pub fn reserve(&mut self, now: DateTime<Utc>) {
        self.status = TableStatus::Reserved;
        self.updated_at = now;
    }
}

/// Create table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TableCreate {
    pub number: u32,
    /// Seats; falls back to the configured default when omitted
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: Option<i32>,
}

/// Occupy table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TableOccupy {
    #[validate(range(min = 1, message = "party size must be at least 1"))]
    pub party_size: i32,
    #[validate(length(min = 1, message = "server name is required"))]
    pub server_name: String,
}
