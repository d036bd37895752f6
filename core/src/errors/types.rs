//! Domain-specific error types for authentication and token management
//!
//! All refresh rejections are terminal: retrying with the same inputs yields
//! the same answer and the client has to log in again.

use thiserror::Error;

/// Client-visible code shared by every refresh rejection
pub const GENERIC_TOKEN_CLIENT_CODE: &str = "invalid_token";

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username or password is incorrect")]
    InvalidCredentials,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Registration failed: {reason}")]
    RegistrationFailed { reason: String },
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The presented refresh token is not in the ledger
    #[error("Refresh token not found")]
    NoSuchToken,

    /// The presented access token could not be decoded or its signature is wrong
    #[error("Malformed access token")]
    MalformedAccessToken,

    /// Access and refresh token belong to different principals or sessions
    #[error("Access token does not match refresh token session")]
    TokenSessionMismatch,

    /// An already consumed refresh token was presented again
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    /// The refresh token is past its expiry
    #[error("Refresh token expired")]
    Expired,

    /// The principal owning the session no longer exists
    #[error("Principal no longer exists")]
    PrincipalGone,

    #[error("Access token expired")]
    AccessTokenExpired,

    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

impl TokenError {
    /// Whether this error is one of the refresh rotation rejections
    pub fn is_rotation_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::NoSuchToken
                | TokenError::MalformedAccessToken
                | TokenError::TokenSessionMismatch
                | TokenError::ReuseDetected
                | TokenError::Expired
                | TokenError::PrincipalGone
        )
    }

    /// Whether this error indicates a possible credential compromise
    pub fn is_security_event(&self) -> bool {
        matches!(self, TokenError::ReuseDetected)
    }

    /// Code exposed to clients
    ///
    /// Rotation rejections collapse into one code so a replaying client cannot
    /// tell reuse detection apart from any other rejection.
    pub fn client_code(&self) -> &'static str {
        match self {
            e if e.is_rotation_rejection() => GENERIC_TOKEN_CLIENT_CODE,
            TokenError::AccessTokenExpired => "token_expired",
            TokenError::InvalidAccessToken => GENERIC_TOKEN_CLIENT_CODE,
            _ => "internal_error",
        }
    }

    /// Stable snake_case name used in logs and audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::NoSuchToken => "no_such_token",
            TokenError::MalformedAccessToken => "malformed_access_token",
            TokenError::TokenSessionMismatch => "token_session_mismatch",
            TokenError::ReuseDetected => "reuse_detected",
            TokenError::Expired => "expired",
            TokenError::PrincipalGone => "principal_gone",
            TokenError::AccessTokenExpired => "access_token_expired",
            TokenError::InvalidAccessToken => "invalid_access_token",
            TokenError::TokenGenerationFailed => "token_generation_failed",
        }
    }
}

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field required: {field}")]
    RequiredField { field: String },

    #[error("Invalid length for field: {field} (min: {min}, actual: {actual})")]
    InvalidLength {
        field: String,
        min: usize,
        actual: usize,
    },
}
