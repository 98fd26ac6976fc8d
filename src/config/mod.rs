//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `BILLING_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use billing_reconciler::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//!
//! println!("Server running on {}", config.server.socket_addr()?);
//! # Ok(())
//! # }
//! ```

mod billing;
mod database;
mod dedup;
mod error;
mod gateway;
mod redis;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use dedup::DedupConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, GatewayCredentials, GatewayMode};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Entitlement store (PostgreSQL)
    pub database: DatabaseConfig,

    /// Notification seen-set backend
    #[serde(default)]
    pub redis: RedisConfig,

    /// Payment gateway credentials and webhook secret
    pub gateway: GatewayConfig,

    /// Plan terms
    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub dedup: DedupConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING__GATEWAY__TEST__PUBLIC_ID=...` -> `gateway.test.public_id = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// A missing webhook secret or missing credentials for the active
    /// gateway mode fails here, at startup, never per request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.gateway.validate()?;
        self.billing.validate()?;
        self.dedup.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("BILLING__DATABASE__URL", "postgresql://test@localhost/billing"),
        ("BILLING__GATEWAY__WEBHOOK_SECRET", "notification-secret"),
        ("BILLING__GATEWAY__TEST__PUBLIC_ID", "pk_test_123"),
        ("BILLING__GATEWAY__TEST__API_SECRET", "api-secret"),
        ("BILLING__BILLING__MONTHLY_PRICE", "299"),
        ("BILLING__BILLING__CURRENCY", "RUB"),
    ];

    const OPTIONAL: &[&str] = &[
        "BILLING__SERVER__PORT",
        "BILLING__SERVER__ENVIRONMENT",
        "BILLING__GATEWAY__MODE",
        "BILLING__DEDUP__ENABLED",
        "BILLING__DEDUP__LEASE_SECS",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).expect("config should load");

        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.gateway.mode, GatewayMode::Test);
        assert_eq!(
            config.gateway.active_credentials().map(|c| c.public_id.as_str()),
            Some("pk_test_123")
        );
        assert_eq!(config.billing.monthly_price, 299.0);
    }

    #[test]
    fn test_validate_full_config() {
        let config = load_with(&[]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.billing.trial_days, 14);
        assert!(config.dedup.enabled);
        assert!(!config.redis.is_configured());
    }

    #[test]
    fn test_live_mode_without_live_credentials_fails_validation() {
        let config = load_with(&[("BILLING__GATEWAY__MODE", "live")]).unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("GATEWAY__LIVE"))
        );
    }

    #[test]
    fn test_is_production() {
        let config = load_with(&[("BILLING__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_dedup_can_be_disabled() {
        let config = load_with(&[("BILLING__DEDUP__ENABLED", "false")]).unwrap();
        assert!(!config.dedup.enabled);
    }
}
