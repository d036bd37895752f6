//! Domain entities representing core business objects.

pub mod audit;
pub mod token;
pub mod user;


// Re-export commonly used types
pub use audit::{AuditEventType, AuditLog};
pub use token::{Claims, InvalidationReason, RefreshToken, RefreshTokenState, TokenPair};
pub use user::{Principal, User};
