//! Service configuration
//!
//! All options can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | TIMEZONE | America/Lima | Business timezone for day boundaries |
//! | CURRENCY_SYMBOL | S/ | Symbol used in human-facing descriptions |
//! | DEFAULT_TABLE_CAPACITY | 4 | Seats assumed when a table is registered without one |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | LOG_LEVEL | info | Default tracing filter |
//! | LOG_DIR | (unset) | Directory for rotating file logs |

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Config {
    /// Business timezone; "today" queries and generated codes use it
    pub timezone: Tz,
    /// Currency symbol for movement descriptions
    pub currency_symbol: String,
    /// Capacity assumed when registering a table without one
    pub default_table_capacity: i32,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Default log level
    pub log_level: String,
    /// Optional directory for file logging
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults. Reads a `.env` file first when present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            timezone: std::env::var("TIMEZONE")
                .ok()
                .and_then(|tz| tz.parse().ok())
                .unwrap_or(chrono_tz::America::Lima),
            currency_symbol: std::env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "S/".into()),
            default_table_capacity: std::env::var("DEFAULT_TABLE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Lima,
            currency_symbol: "S/".into(),
            default_table_capacity: 4,
            environment: "development".into(),
            log_level: "info".into(),
            log_dir: None,
        }
    }
}
