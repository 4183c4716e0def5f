//! Shared infrastructure

pub mod logger;

pub use logger::init_logger;
