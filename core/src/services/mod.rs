//! Business services containing domain logic and use cases.

pub mod audit;
pub mod auth;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditService, AuditServiceConfig};
pub use auth::{AuthService, AuthServiceConfig};
pub use token::{
    CleanupResult, TokenCleanupConfig, TokenCleanupService, TokenService, TokenServiceConfig,
};
