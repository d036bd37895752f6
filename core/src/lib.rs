//! # MagicVilla Core
//!
//! Domain layer of the MagicVilla authentication backend: the token authority
//! that issues and rotates refresh tokens, the account flow built on top of
//! it, the repository interfaces it persists through, and its error types.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::{
    AuditEventType, AuditLog, Claims, InvalidationReason, LoginResponse, Principal, RefreshToken,
    RefreshTokenState, RegistrationRequest, TokenPair, User,
};
pub use errors::{AuthError, DomainError, DomainResult, TokenError, ValidationError};
pub use repositories::{AuditLogRepository, NoOpAuditLogRepository, TokenRepository, UserRepository};
pub use services::{
    AuditService, AuditServiceConfig, AuthService, AuthServiceConfig, TokenCleanupConfig,
    TokenCleanupService, TokenService, TokenServiceConfig,
};
