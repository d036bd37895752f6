//! MySQL implementation of the TokenRepository trait.
//!
//! Refresh tokens live in the `refresh_tokens` table keyed by the SHA-256
//! digest of the token string. Invalidation is a guarded `UPDATE` so the
//! affected-row count doubles as the compare-and-set result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use mv_core::domain::entities::token::{InvalidationReason, RefreshToken};
use mv_core::errors::DomainError;
use mv_core::repositories::TokenRepository;

use super::{db_error, parse_uuid};

const TOKEN_COLUMNS: &str = "id, user_id, session_id, token_hash, created_at, expires_at, \
     is_valid, invalidated_at, invalidation_reason, family_revoked_at";

/// MySQL implementation of TokenRepository
#[derive(Clone)]
pub struct MySqlTokenRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlTokenRepository {
    /// Create a new MySQL token repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to RefreshToken entity
    fn row_to_token(row: &sqlx::mysql::MySqlRow) -> Result<RefreshToken, DomainError> {
        let id: String = row.try_get("id").map_err(db_error("get id"))?;
        let user_id: String = row.try_get("user_id").map_err(db_error("get user_id"))?;
        let session_id: String = row.try_get("session_id").map_err(db_error("get session_id"))?;
        let reason: Option<String> = row
            .try_get("invalidation_reason")
            .map_err(db_error("get invalidation_reason"))?;

        let invalidation_reason = match reason {
            Some(value) => Some(InvalidationReason::parse(&value).ok_or_else(|| {
                DomainError::Internal {
                    message: format!("Unknown invalidation reason: {}", value),
                }
            })?),
            None => None,
        };

        Ok(RefreshToken {
            id: parse_uuid(&id, "token id")?,
            user_id: parse_uuid(&user_id, "user id")?,
            session_id: parse_uuid(&session_id, "session id")?,
            token_hash: row.try_get("token_hash").map_err(db_error("get token_hash"))?,
            created_at: row.try_get("created_at").map_err(db_error("get created_at"))?,
            expires_at: row.try_get("expires_at").map_err(db_error("get expires_at"))?,
            is_valid: row.try_get("is_valid").map_err(db_error("get is_valid"))?,
            invalidated_at: row
                .try_get("invalidated_at")
                .map_err(db_error("get invalidated_at"))?,
            invalidation_reason,
            family_revoked_at: row
                .try_get("family_revoked_at")
                .map_err(db_error("get family_revoked_at"))?,
        })
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let query = r#"
            INSERT INTO refresh_tokens (
                id, user_id, session_id, token_hash, created_at, expires_at,
                is_valid, invalidated_at, invalidation_reason, family_revoked_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(token.id.to_string())
            .bind(token.user_id.to_string())
            .bind(token.session_id.to_string())
            .bind(&token.token_hash)
            .bind(token.created_at)
            .bind(token.expires_at)
            .bind(token.is_valid)
            .bind(token.invalidated_at)
            .bind(token.invalidation_reason.map(|r| r.as_str()))
            .bind(token.family_revoked_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    DomainError::Validation {
                        message: "Token already exists".to_string(),
                    }
                }
                other => db_error("save refresh token")(other),
            })?;

        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = ? LIMIT 1",
            TOKEN_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find refresh token"))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn invalidate_token(
        &self,
        token_hash: &str,
        reason: InvalidationReason,
    ) -> Result<bool, DomainError> {
        let query = r#"
            UPDATE refresh_tokens
            SET is_valid = FALSE, invalidated_at = ?, invalidation_reason = ?
            WHERE token_hash = ? AND is_valid = TRUE
        "#;

        let result = sqlx::query(query)
            .bind(Utc::now())
            .bind(reason.as_str())
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(db_error("invalidate token"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn invalidate_session(
        &self,
        session_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError> {
        let now = Utc::now();
        let session = session_id.to_string();

        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let invalidated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_valid = FALSE, invalidated_at = ?, invalidation_reason = ?
            WHERE session_id = ? AND is_valid = TRUE
            "#,
        )
        .bind(now)
        .bind(reason.as_str())
        .bind(&session)
        .execute(&mut *tx)
        .await
        .map_err(db_error("invalidate session"))?;

        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET family_revoked_at = COALESCE(family_revoked_at, ?)
            WHERE session_id = ?
            "#,
        )
        .bind(now)
        .bind(&session)
        .execute(&mut *tx)
        .await
        .map_err(db_error("mark session revoked"))?;

        tx.commit().await.map_err(db_error("commit session revocation"))?;

        Ok(invalidated.rows_affected() as usize)
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<RefreshToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE session_id = ? ORDER BY created_at ASC",
            TOKEN_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("find session tokens"))?;

        rows.iter().map(Self::row_to_token).collect()
    }

    async fn revoke_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError> {
        let now = Utc::now();
        let user = user_id.to_string();

        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let invalidated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_valid = FALSE, invalidated_at = ?, invalidation_reason = ?
            WHERE user_id = ? AND is_valid = TRUE
            "#,
        )
        .bind(now)
        .bind(reason.as_str())
        .bind(&user)
        .execute(&mut *tx)
        .await
        .map_err(db_error("revoke user tokens"))?;

        // A session belongs to one principal, so this covers every row of
        // every affected session.
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET family_revoked_at = COALESCE(family_revoked_at, ?)
            WHERE user_id = ?
            "#,
        )
        .bind(now)
        .bind(&user)
        .execute(&mut *tx)
        .await
        .map_err(db_error("mark user sessions revoked"))?;

        tx.commit().await.map_err(db_error("commit user revocation"))?;

        Ok(invalidated.rows_affected() as usize)
    }

    async fn delete_expired_tokens(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete expired tokens"))?;

        Ok(result.rows_affected() as usize)
    }
}
