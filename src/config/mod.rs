//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `TOWNHALL` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use townhall_presence::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod breakout;
mod database;
mod error;
mod server;

pub use auth::AuthConfig;
pub use breakout::BreakoutConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL storage; in-memory storage when absent
    pub database: Option<DatabaseConfig>,

    /// Token verification (OIDC issuer, audience)
    pub auth: AuthConfig,

    /// Room partitioning and outbound delivery
    #[serde(default)]
    pub breakout: BreakoutConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `TOWNHALL__*` variables:
    ///
    /// - `TOWNHALL__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TOWNHALL__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a value
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TOWNHALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.auth.validate(&self.server.environment)?;
        self.breakout.validate(&self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "TOWNHALL__AUTH__ISSUER",
        "TOWNHALL__AUTH__AUDIENCE",
        "TOWNHALL__SERVER__PORT",
        "TOWNHALL__DATABASE__URL",
        "TOWNHALL__BREAKOUT__MAX_ROOMS",
        "TOWNHALL__BREAKOUT__CHANNEL_CAPACITY",
    ];

    fn set_minimal_env() {
        env::set_var("TOWNHALL__AUTH__ISSUER", "https://auth.example.com");
        env::set_var("TOWNHALL__AUTH__AUDIENCE", "townhall");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_minimal_uses_in_memory_storage() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.breakout.channel_capacity, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nested_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        set_minimal_env();
        env::set_var("TOWNHALL__SERVER__PORT", "9000");
        env::set_var("TOWNHALL__DATABASE__URL", "postgresql://localhost/townhall");
        env::set_var("TOWNHALL__BREAKOUT__MAX_ROOMS", "12");
        env::set_var("TOWNHALL__BREAKOUT__CHANNEL_CAPACITY", "64");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.database.map(|d| d.url),
            Some("postgresql://localhost/townhall".to_string())
        );
        assert_eq!(config.breakout.max_rooms, Some(12));
        assert_eq!(config.breakout.channel_capacity, 64);
    }

    #[test]
    fn test_missing_auth_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_validate_checks_optional_database() {
        let config = AppConfig {
            server: ServerConfig::default(),
            database: Some(DatabaseConfig {
                url: "mysql://nope".to_string(),
                ..Default::default()
            }),
            auth: AuthConfig {
                issuer: "https://auth.example.com".to_string(),
                audience: "townhall".to_string(),
                ..Default::default()
            },
            breakout: BreakoutConfig::default(),
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }
}
