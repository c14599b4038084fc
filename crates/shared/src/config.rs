//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::money::DEFAULT_BANK_TOLERANCE;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Period closing rules.
    #[serde(default)]
    pub closing: ClosingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Rules applied when validating and closing accounting periods.
#[derive(Debug, Clone, Deserialize)]
pub struct ClosingConfig {
    /// Maximum absolute difference accepted between a bank account's
    /// ledger-derived balance and its recorded balance.
    #[serde(default = "default_bank_tolerance")]
    pub bank_tolerance: Decimal,
    /// Sequence prefix used when a ledger entry is created without one.
    #[serde(default = "default_entry_prefix")]
    pub default_entry_prefix: String,
    /// Require periods of a fiscal year to be closed in order.
    #[serde(default = "default_sequential_close")]
    pub sequential_close: bool,
}

impl Default for ClosingConfig {
    fn default() -> Self {
        Self {
            bank_tolerance: default_bank_tolerance(),
            default_entry_prefix: default_entry_prefix(),
            sequential_close: default_sequential_close(),
        }
    }
}

fn default_bank_tolerance() -> Decimal {
    DEFAULT_BANK_TOLERANCE
}

fn default_entry_prefix() -> String {
    "JE".to_string()
}

fn default_sequential_close() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "closebook=info,sea_orm=warn".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CLOSEBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_closing_defaults() {
        let closing = ClosingConfig::default();
        assert_eq!(closing.bank_tolerance, dec!(0.01));
        assert_eq!(closing.default_entry_prefix, "JE");
        assert!(closing.sequential_close);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("CLOSEBOOK__DATABASE__URL", Some("postgres://localhost/closebook_test")),
                ("CLOSEBOOK__CLOSING__DEFAULT_ENTRY_PREFIX", Some("AS")),
                ("CLOSEBOOK__LOGGING__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/closebook_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.closing.default_entry_prefix, "AS");
                assert_eq!(config.closing.bank_tolerance, dec!(0.01));
                assert!(config.logging.json);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars_unset(["CLOSEBOOK__DATABASE__URL", "DATABASE_URL"], || {
            assert!(AppConfig::load().is_err());
        });
    }
}
