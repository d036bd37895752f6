//! Mock implementation of AuditLogRepository for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::entities::audit::{AuditEventType, AuditLog};
use crate::errors::DomainError;

use super::AuditLogRepository;

/// Mock implementation of AuditLogRepository for testing
#[derive(Clone)]
pub struct MockAuditLogRepository {
    logs: Arc<Mutex<Vec<AuditLog>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockAuditLogRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Get all stored logs for testing
    pub fn get_all_logs(&self) -> Vec<AuditLog> {
        self.logs.lock().unwrap().clone()
    }

    /// Stored logs of one event type
    pub fn logs_of(&self, event_type: AuditEventType) -> Vec<AuditLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.event_type == event_type)
            .cloned()
            .collect()
    }

    fn check_failure(&self) -> Result<(), DomainError> {
        if *self.should_fail.lock().unwrap() {
            return Err(DomainError::Internal {
                message: "Mock repository error".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockAuditLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLogRepository for MockAuditLogRepository {
    async fn create(&self, audit_log: &AuditLog) -> Result<(), DomainError> {
        self.check_failure()?;
        self.logs.lock().unwrap().push(audit_log.clone());
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditLog>, DomainError> {
        self.check_failure()?;

        let logs = self.logs.lock().unwrap();
        let mut result: Vec<AuditLog> = logs
            .iter()
            .filter(|log| log.user_id == Some(user_id))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        Ok(result)
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<AuditLog>, DomainError> {
        self.check_failure()?;

        let logs = self.logs.lock().unwrap();
        let mut result: Vec<AuditLog> = logs
            .iter()
            .filter(|log| log.session_id == Some(session_id))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}
