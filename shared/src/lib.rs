//! Shared configuration types for the MagicVilla server
//!
//! This crate provides functionality used across all server modules:
//! - Environment detection
//! - Authentication, database and logging configuration
//! - Layered configuration loading (defaults, config file, environment)

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CleanupConfig, ConfigError, DatabaseConfig, Environment, JwtConfig,
    LogFormat, LoggingConfig, PasswordConfig, MAX_RETENTION_DAYS, MAX_TOKEN_EXPIRY_SECONDS,
};
