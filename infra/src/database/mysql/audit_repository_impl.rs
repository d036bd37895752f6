//! MySQL implementation of the AuditLogRepository trait.
//!
//! Audit entries are append-only rows in `auth_audit_logs`; metadata is kept
//! as serialized JSON text.

use async_trait::async_trait;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use mv_core::domain::entities::audit::{AuditEventType, AuditLog};
use mv_core::errors::DomainError;
use mv_core::repositories::AuditLogRepository;

use super::{db_error, parse_optional_uuid, parse_uuid};

const AUDIT_COLUMNS: &str = "id, event_type, user_id, session_id, username, success, \
     failure_reason, metadata, created_at";

/// MySQL implementation of AuditLogRepository
#[derive(Clone)]
pub struct MySqlAuditLogRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlAuditLogRepository {
    /// Create a new MySQL audit log repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to AuditLog entity
    fn row_to_audit_log(row: &sqlx::mysql::MySqlRow) -> Result<AuditLog, DomainError> {
        let id: String = row.try_get("id").map_err(db_error("get id"))?;

        let event_type_str: String = row.try_get("event_type").map_err(db_error("get event_type"))?;
        let event_type = AuditEventType::parse(&event_type_str).ok_or_else(|| {
            DomainError::Internal {
                message: format!("Unknown event type: {}", event_type_str),
            }
        })?;

        let user_id: Option<String> = row.try_get("user_id").map_err(db_error("get user_id"))?;
        let session_id: Option<String> =
            row.try_get("session_id").map_err(db_error("get session_id"))?;

        let metadata: Option<String> = row.try_get("metadata").map_err(db_error("get metadata"))?;
        let metadata = metadata
            .map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to parse audit metadata: {}", e),
            })?;

        Ok(AuditLog {
            id: parse_uuid(&id, "audit id")?,
            event_type,
            user_id: parse_optional_uuid(user_id, "user id")?,
            session_id: parse_optional_uuid(session_id, "session id")?,
            username: row.try_get("username").map_err(db_error("get username"))?,
            success: row.try_get("success").map_err(db_error("get success"))?,
            failure_reason: row
                .try_get("failure_reason")
                .map_err(db_error("get failure_reason"))?,
            metadata,
            created_at: row.try_get("created_at").map_err(db_error("get created_at"))?,
        })
    }
}

#[async_trait]
impl AuditLogRepository for MySqlAuditLogRepository {
    async fn create(&self, audit_log: &AuditLog) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO auth_audit_logs (
                id, event_type, user_id, session_id, username, success,
                failure_reason, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let metadata = audit_log
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to serialize audit metadata: {}", e),
            })?;

        sqlx::query(query)
            .bind(audit_log.id.to_string())
            .bind(audit_log.event_type.as_str())
            .bind(audit_log.user_id.map(|id| id.to_string()))
            .bind(audit_log.session_id.map(|id| id.to_string()))
            .bind(&audit_log.username)
            .bind(audit_log.success)
            .bind(&audit_log.failure_reason)
            .bind(metadata)
            .bind(audit_log.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("create audit log"))?;

        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditLog>, DomainError> {
        let query = format!(
            "SELECT {} FROM auth_audit_logs WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
            AUDIT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(limit as u64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("find audit logs by user"))?;

        rows.iter().map(Self::row_to_audit_log).collect()
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<AuditLog>, DomainError> {
        let query = format!(
            "SELECT {} FROM auth_audit_logs WHERE session_id = ? ORDER BY created_at ASC",
            AUDIT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("find audit logs by session"))?;

        rows.iter().map(Self::row_to_audit_log).collect()
    }
}
