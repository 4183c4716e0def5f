//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Till errors
//! - 7xxx: Table errors
//! - 8xxx: Inventory errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order already paid
    OrderAlreadyPaid = 4001,
    /// Order already voided
    OrderAlreadyVoided = 4002,
    /// Transition not allowed by the order state machine
    InvalidTransition = 4003,

    // ==================== 5xxx: Till ====================
    /// A cash session is already open
    SessionAlreadyOpen = 5001,
    /// No cash session is open
    NoOpenSession = 5002,

    // ==================== 7xxx: Table ====================
    /// Table is not in the state the operation requires
    TableNotAvailable = 7001,
    /// Table is occupied
    TableOccupied = 7002,
    /// Party size exceeds table capacity
    CapacityExceeded = 7003,
    /// Table is not occupied
    TableNotOccupied = 7004,

    // ==================== 8xxx: Inventory ====================
    /// Recipe line references an unknown ingredient
    UnknownRecipeIngredient = 8001,
}

impl ErrorCode {
    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field missing",
            ErrorCode::ValueOutOfRange => "Value out of range",
            ErrorCode::OrderAlreadyPaid => "Order already paid",
            ErrorCode::OrderAlreadyVoided => "Order already voided",
            ErrorCode::InvalidTransition => "Transition not allowed",
            ErrorCode::SessionAlreadyOpen => "A cash session is already open",
            ErrorCode::NoOpenSession => "No cash session is open",
            ErrorCode::TableNotAvailable => "Table is not available",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::CapacityExceeded => "Party size exceeds table capacity",
            ErrorCode::TableNotOccupied => "Table is not occupied",
            ErrorCode::UnknownRecipeIngredient => "Recipe references an unknown ingredient",
        }
    }

    /// Whether this code describes a state conflict the caller can correct
    /// by re-reading the aggregate and retrying with fresh state
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            ErrorCode::OrderAlreadyPaid
                | ErrorCode::OrderAlreadyVoided
                | ErrorCode::InvalidTransition
                | ErrorCode::SessionAlreadyOpen
                | ErrorCode::NoOpenSession
                | ErrorCode::TableNotAvailable
                | ErrorCode::TableOccupied
                | ErrorCode::CapacityExceeded
                | ErrorCode::TableNotOccupied
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), *self as u16)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            7 => ErrorCode::RequiredField,
            8 => ErrorCode::ValueOutOfRange,
            4001 => ErrorCode::OrderAlreadyPaid,
            4002 => ErrorCode::OrderAlreadyVoided,
            4003 => ErrorCode::InvalidTransition,
            5001 => ErrorCode::SessionAlreadyOpen,
            5002 => ErrorCode::NoOpenSession,
            7001 => ErrorCode::TableNotAvailable,
            7002 => ErrorCode::TableOccupied,
            7003 => ErrorCode::CapacityExceeded,
            7004 => ErrorCode::TableNotOccupied,
            8001 => ErrorCode::UnknownRecipeIngredient,
            other => return Err(format!("unknown error code: {}", other)),
        };
        Ok(code)
    }
}
