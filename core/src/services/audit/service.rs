//! Audit service for recording account and token lifecycle events.
//!
//! Audit writes never fail the operation they describe: errors are reported
//! through `tracing` and otherwise dropped.

use std::sync::Arc;

use serde_json::json;
use tokio::task;
use tracing::error;
use uuid::Uuid;

use crate::domain::entities::audit::{AuditEventType, AuditLog};
use crate::errors::{DomainResult, TokenError};
use crate::repositories::AuditLogRepository;

/// Configuration for the audit service
#[derive(Debug, Clone)]
pub struct AuditServiceConfig {
    /// Whether to run audit writes asynchronously
    pub async_writes: bool,
}

impl Default for AuditServiceConfig {
    fn default() -> Self {
        Self { async_writes: true }
    }
}

/// Service recording audit entries for the authentication flows
pub struct AuditService<R>
where
    R: AuditLogRepository,
{
    repository: Arc<R>,
    config: AuditServiceConfig,
}

impl<R> AuditService<R>
where
    R: AuditLogRepository + 'static,
{
    /// Create a new audit service
    pub fn new(repository: Arc<R>, config: AuditServiceConfig) -> Self {
        Self { repository, config }
    }

    /// Record a registration attempt
    pub async fn log_registration(
        &self,
        username: &str,
        user_id: Option<Uuid>,
        failure: Option<&str>,
    ) {
        let mut log = match user_id {
            Some(id) => AuditLog::new(AuditEventType::UserRegistered, true).with_user(id),
            None => AuditLog::new(AuditEventType::RegistrationFailure, false),
        };
        log = log.with_username(username);
        if let Some(reason) = failure {
            log = log.with_failure(reason);
        }
        self.write_log(log).await;
    }

    /// Record a login attempt
    pub async fn log_login(
        &self,
        username: &str,
        user_id: Option<Uuid>,
        session_id: Option<Uuid>,
        failure: Option<&str>,
    ) {
        let mut log = match failure {
            None => AuditLog::new(AuditEventType::LoginSuccess, true),
            Some(reason) => AuditLog::new(AuditEventType::LoginFailure, false).with_failure(reason),
        }
        .with_username(username);

        if let Some(id) = user_id {
            log = log.with_user(id);
        }
        if let Some(id) = session_id {
            log = log.with_session(id);
        }
        self.write_log(log).await;
    }

    /// Record a successful rotation
    pub async fn log_refresh_success(&self, user_id: Option<Uuid>, session_id: Uuid) {
        let mut log = AuditLog::new(AuditEventType::TokenRefreshed, true).with_session(session_id);
        if let Some(id) = user_id {
            log = log.with_user(id);
        }
        self.write_log(log).await;
    }

    /// Record a rejected rotation
    ///
    /// Reuse detection gets its own event type so it can be alerted on.
    pub async fn log_refresh_failure(&self, error: &TokenError, session_id: Option<Uuid>) {
        let event = if error.is_security_event() {
            AuditEventType::RefreshTokenReuse
        } else {
            AuditEventType::RefreshTokenFailure
        };

        let mut log = AuditLog::new(event, false)
            .with_failure(error.as_str())
            .with_metadata(json!({ "client_code": error.client_code() }));
        if let Some(id) = session_id {
            log = log.with_session(id);
        }
        self.write_log(log).await;
    }

    /// Record a logout
    pub async fn log_logout(&self, session_id: Option<Uuid>, revoked: usize) {
        let mut log = AuditLog::new(AuditEventType::Logout, true)
            .with_metadata(json!({ "revoked_tokens": revoked }));
        if let Some(id) = session_id {
            log = log.with_session(id);
        }
        self.write_log(log).await;
    }

    /// Get recent audit logs for a user
    pub async fn get_user_audit_logs(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> DomainResult<Vec<AuditLog>> {
        self.repository.find_by_user(user_id, limit).await
    }

    /// Get the audit trail of one session
    pub async fn get_session_audit_logs(&self, session_id: Uuid) -> DomainResult<Vec<AuditLog>> {
        self.repository.find_by_session(session_id).await
    }

    /// If async_writes is enabled, the write happens in a background task
    /// to avoid blocking the main flow.
    async fn write_log(&self, audit_log: AuditLog) {
        if self.config.async_writes {
            let repository = Arc::clone(&self.repository);

            task::spawn(async move {
                if let Err(e) = repository.create(&audit_log).await {
                    error!(event = audit_log.event_type.as_str(), "Failed to write audit log: {}", e);
                }
            });
        } else if let Err(e) = self.repository.create(&audit_log).await {
            error!(event = audit_log.event_type.as_str(), "Failed to write audit log: {}", e);
        }
    }
}
