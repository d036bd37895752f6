//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - Token lifetimes, signing secret, password hashing and cleanup
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod database;
pub mod environment;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use auth::{
    AuthConfig, CleanupConfig, JwtConfig, PasswordConfig, MAX_RETENTION_DAYS,
    MAX_TOKEN_EXPIRY_SECONDS,
};
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Prefix for layered environment overrides, e.g. `MV__AUTH__JWT__SECRET`
pub const ENV_PREFIX: &str = "MV";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl AppConfig {
    /// Built-in defaults for an environment
    pub fn for_environment(environment: Environment) -> Self {
        let database = match environment {
            Environment::Development => DatabaseConfig::new("mysql://localhost:3306/magicvilla_dev"),
            Environment::Staging => DatabaseConfig::new("mysql://localhost:3306/magicvilla_staging"),
            Environment::Production => {
                DatabaseConfig::new("mysql://prod-db:3306/magicvilla").with_max_connections(50)
            }
        };

        Self {
            environment,
            database,
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load configuration from environment variables only
    ///
    /// Reads the plain variables (`DATABASE_URL`, `JWT_SECRET`, ...) on top of
    /// the defaults for the detected environment.
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load layered configuration
    ///
    /// Sources, later ones winning:
    /// 1. built-in defaults for the detected environment
    /// 2. `config.<environment>.toml` in the working directory, if present
    /// 3. `MV__`-prefixed environment variables (`MV__AUTH__JWT__SECRET`)
    ///
    /// A `.env` file is read first when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let defaults = Self::for_environment(environment);

        let settings = ::config::Config::builder()
            .add_source(::config::Config::try_from(&defaults)?)
            .add_source(::config::File::with_name(environment.config_file()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        if self.environment.is_production() && self.auth.jwt.is_using_default_secret() {
            return Err(ConfigError::Invalid(
                "auth.jwt.secret must be set in production".to_string(),
            ));
        }

        Ok(())
    }
}
