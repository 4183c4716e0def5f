//! Shared types for the Comanda floor coordination core
//!
//! Domain models, request payloads and the unified error types used by
//! `floor-core` and by the request-handling layers that embed it.

pub mod error;
pub mod models;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
