//! MySQL repository implementations

mod audit_repository_impl;
mod token_repository_impl;
mod user_repository_impl;

pub use audit_repository_impl::MySqlAuditLogRepository;
pub use token_repository_impl::MySqlTokenRepository;
pub use user_repository_impl::MySqlUserRepository;

use mv_core::errors::DomainError;
use uuid::Uuid;

/// Wraps a SQLx failure into a domain error naming the failed step
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::Internal {
        message: format!("Failed to {}: {}", context, e),
    }
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value).map_err(|e| DomainError::Internal {
        message: format!("Invalid {} UUID: {}", what, e),
    })
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    what: &str,
) -> Result<Option<Uuid>, DomainError> {
    value.map(|v| parse_uuid(&v, what)).transpose()
}
