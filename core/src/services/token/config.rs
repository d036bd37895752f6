//! Configuration for the token service

use chrono::Duration;
use jsonwebtoken::Algorithm;
use mv_shared::{JwtConfig, MAX_TOKEN_EXPIRY_SECONDS};

use crate::errors::DomainError;

/// Configuration for the token service
///
/// Built once from [`JwtConfig`] and handed to [`super::TokenService::new`];
/// the service never reads configuration from anywhere else.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// HMAC signing secret
    pub jwt_secret: String,
    /// JWT signing algorithm (HMAC family only)
    pub algorithm: Algorithm,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Value of the `aud` claim
    pub audience: String,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-please-change-in-production".to_string(),
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::seconds(60),
            refresh_token_ttl: Duration::seconds(180),
            issuer: "magic-villa".to_string(),
            audience: "magic-villa-api".to_string(),
        }
    }
}

impl TokenServiceConfig {
    /// Builds the service configuration from the application's JWT section
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the algorithm is unknown or not
    /// an HMAC algorithm, or when a lifetime is not positive or longer than
    /// [`MAX_TOKEN_EXPIRY_SECONDS`].
    pub fn from_jwt_config(jwt: &JwtConfig) -> Result<Self, DomainError> {
        let algorithm = parse_hmac_algorithm(&jwt.algorithm)?;

        Ok(Self {
            jwt_secret: jwt.secret.clone(),
            algorithm,
            access_token_ttl: lifetime("access", jwt.access_token_expiry)?,
            refresh_token_ttl: lifetime("refresh", jwt.refresh_token_expiry)?,
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
        })
    }

    /// Access token lifetime in whole seconds
    pub fn access_expires_in(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }

    /// Refresh token lifetime in whole seconds
    pub fn refresh_expires_in(&self) -> i64 {
        self.refresh_token_ttl.num_seconds()
    }
}

impl TryFrom<&JwtConfig> for TokenServiceConfig {
    type Error = DomainError;

    fn try_from(jwt: &JwtConfig) -> Result<Self, Self::Error> {
        Self::from_jwt_config(jwt)
    }
}

fn lifetime(kind: &str, seconds: i64) -> Result<Duration, DomainError> {
    if !(1..=MAX_TOKEN_EXPIRY_SECONDS).contains(&seconds) {
        return Err(DomainError::Validation {
            message: format!(
                "{kind} token lifetime must be between 1 and {MAX_TOKEN_EXPIRY_SECONDS} seconds, got {seconds}"
            ),
        });
    }

    Duration::try_seconds(seconds).ok_or_else(|| DomainError::Validation {
        message: format!("{kind} token lifetime out of range: {seconds}"),
    })
}

fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, DomainError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(DomainError::Validation {
            message: format!("unsupported JWT algorithm: {other}"),
        }),
    }
}
