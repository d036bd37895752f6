//! Authentication and token lifecycle configuration

use serde::{Deserialize, Serialize};

use super::ConfigError;

const DEFAULT_SECRET: &str = "development-secret-please-change-in-production";

/// Longest accepted token lifetime (one year, in seconds)
pub const MAX_TOKEN_EXPIRY_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Longest accepted retention of expired ledger rows (ten years, in days)
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// JWT authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub secret: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Algorithm for JWT signing (HS256, HS384 or HS512)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEFAULT_SECRET),
            access_token_expiry: 60,   // 1 minute
            refresh_token_expiry: 180, // 3 minutes
            issuer: String::from("magic-villa"),
            audience: String::from("magic-villa-api"),
            algorithm: default_algorithm(),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in minutes
    pub fn with_refresh_expiry_minutes(mut self, minutes: i64) -> Self {
        self.refresh_token_expiry = minutes * 60;
        self
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("auth.jwt.secret is empty".to_string()));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::Invalid(
                "token expiry values must be positive".to_string(),
            ));
        }
        if self.access_token_expiry > MAX_TOKEN_EXPIRY_SECONDS
            || self.refresh_token_expiry > MAX_TOKEN_EXPIRY_SECONDS
        {
            return Err(ConfigError::Invalid(format!(
                "token expiry values must not exceed {} seconds",
                MAX_TOKEN_EXPIRY_SECONDS
            )));
        }
        if self.refresh_token_expiry < self.access_token_expiry {
            return Err(ConfigError::Invalid(
                "refresh token must outlive the access token".to_string(),
            ));
        }
        Ok(())
    }
}

/// Password hashing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasswordConfig {
    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// Minimum accepted password length at registration
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: 12,
            min_length: 6,
        }
    }
}

/// Expired refresh token cleanup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Whether the background cleanup task runs
    pub enabled: bool,

    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,

    /// How long expired rows are kept for audit before deletion (in days)
    pub retention_days: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 3600,
            retention_days: 7,
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Password hashing configuration
    #[serde(default)]
    pub password: PasswordConfig,

    /// Ledger cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = JwtConfig::default();
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or(defaults.secret);
        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.access_token_expiry);
        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.refresh_token_expiry);
        let algorithm = std::env::var("JWT_ALGORITHM").unwrap_or(defaults.algorithm);

        Self {
            jwt: JwtConfig {
                secret: jwt_secret,
                access_token_expiry,
                refresh_token_expiry,
                issuer: defaults.issuer,
                audience: defaults.audience,
                algorithm,
            },
            password: PasswordConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }

    /// Validate the authentication settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;

        if !(4..=31).contains(&self.password.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "auth.password.bcrypt_cost must be between 4 and 31, got {}",
                self.password.bcrypt_cost
            )));
        }
        if !(0..=MAX_RETENTION_DAYS).contains(&self.cleanup.retention_days) {
            return Err(ConfigError::Invalid(format!(
                "auth.cleanup.retention_days must be between 0 and {}, got {}",
                MAX_RETENTION_DAYS, self.cleanup.retention_days
            )));
        }

        Ok(())
    }
}

fn default_algorithm() -> String {
    String::from("HS256")
}
