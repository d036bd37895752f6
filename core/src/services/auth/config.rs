//! Configuration for the authentication service

use mv_shared::PasswordConfig;

/// Configuration for the authentication service
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Minimum accepted password length
    pub min_password_length: usize,
    /// Whether to allow registration of new users
    pub allow_registration: bool,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            min_password_length: 6,
            allow_registration: true,
        }
    }
}

impl From<&PasswordConfig> for AuthServiceConfig {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            bcrypt_cost: config.bcrypt_cost,
            min_password_length: config.min_length,
            ..Self::default()
        }
    }
}
