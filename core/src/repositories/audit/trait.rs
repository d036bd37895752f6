//! Audit log repository trait defining the interface for audit log persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::audit::AuditLog;
use crate::errors::DomainError;

/// Repository trait for AuditLog entity persistence operations
///
/// Audit writes sit on the authentication path; callers treat a failed write
/// as a logging concern, never as a failed request.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Create a new audit log entry
    ///
    /// # Arguments
    /// * `audit_log` - The audit log entry to persist
    ///
    /// # Returns
    /// * `Ok(())` on successful creation
    /// * `Err(DomainError)` if the operation fails
    async fn create(&self, audit_log: &AuditLog) -> Result<(), DomainError>;

    /// Find audit logs by user ID
    ///
    /// # Returns
    /// * List of audit logs for the user, ordered by created_at descending
    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditLog>, DomainError>;

    /// Find audit logs for one session, ordered by created_at ascending
    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<AuditLog>, DomainError>;
}
