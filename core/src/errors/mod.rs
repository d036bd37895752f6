//! Domain-specific error types and error handling.

mod types;


// Re-export all error types
pub use types::{AuthError, TokenError, ValidationError, GENERIC_TOKEN_CLIENT_CODE};

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    ValidationErr(#[from] ValidationError),
}

impl DomainError {
    /// Returns the token error kind, if this is one
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            DomainError::Token(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller has to restart the login flow
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            DomainError::Auth(AuthError::InvalidCredentials) => true,
            DomainError::Token(e) => e.is_rotation_rejection(),
            _ => false,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
