//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Variables carry the `DOCSTREAM` prefix and nested values
//! are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use docstream::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod database;
mod error;
mod realtime;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use realtime::RealtimeConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults except `database`, whose absence selects the
/// in-memory document store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Room and connection tuning
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DOCSTREAM` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `DOCSTREAM__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `DOCSTREAM__DATABASE__URL=...` -> `database.url = ...`
    /// - `DOCSTREAM__REALTIME__OUTBOUND_CAPACITY=512` -> `realtime.outbound_capacity = 512`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DOCSTREAM")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.realtime.validate()?;
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

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "DOCSTREAM__DATABASE__URL",
        "DOCSTREAM__SERVER__PORT",
        "DOCSTREAM__SERVER__ENVIRONMENT",
        "DOCSTREAM__REALTIME__OUTBOUND_CAPACITY",
        "DOCSTREAM__REALTIME__OPERATION_TIMEOUT_SECS",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_without_database_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.realtime.outbound_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_database_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("DOCSTREAM__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let database = config.database.expect("database section");
        assert_eq!(database.url, "postgresql://test@localhost/test");
        assert_eq!(database.max_connections, 10);
    }

    #[test]
    fn test_realtime_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("DOCSTREAM__REALTIME__OUTBOUND_CAPACITY", "8");
        env::set_var("DOCSTREAM__REALTIME__OPERATION_TIMEOUT_SECS", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.realtime.outbound_capacity, 8);
        assert_eq!(config.realtime.operation_timeout_secs, 0);
        assert_eq!(config.realtime.inbound_capacity, 64);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("DOCSTREAM__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("DOCSTREAM__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_rejects_bad_database_url() {
        let config = AppConfig {
            database: Some(DatabaseConfig {
                url: "mysql://localhost/db".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
