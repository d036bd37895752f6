//! Token repository trait defining the refresh token ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::token::{InvalidationReason, RefreshToken};
use crate::errors::DomainError;

/// Repository trait for the refresh token ledger
///
/// Rows are keyed by the SHA-256 digest of the token string. Rotation never
/// deletes a row: consumed tokens stay in the ledger flagged invalid so that a
/// replay can be recognised and the whole session revoked.
///
/// # Atomicity
/// `invalidate_token` must be a compare-and-set: only a row that is still
/// valid may change, and the return value reports whether it did. Two
/// concurrent rotations of the same token rely on this to elect exactly one
/// winner.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Save a new refresh token to the ledger
    ///
    /// # Returns
    /// * `Ok(RefreshToken)` - The saved token
    /// * `Err(DomainError)` - Save failed (e.g., duplicate token hash)
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::Duration;
    /// # use uuid::Uuid;
    /// # use mv_core::repositories::TokenRepository;
    /// # use mv_core::domain::entities::token::RefreshToken;
    /// # async fn example(repo: &impl TokenRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let token = RefreshToken::new(
    ///     Uuid::new_v4(),
    ///     Uuid::new_v4(),
    ///     "sha256_of_token".to_string(),
    ///     Duration::minutes(3),
    /// );
    ///
    /// let saved = repo.save_refresh_token(token).await?;
    /// println!("Token saved with ID: {}", saved.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError>;

    /// Find a refresh token by its hashed value
    ///
    /// # Returns
    /// * `Ok(Some(RefreshToken))` - Token found, valid or not
    /// * `Ok(None)` - No token found with given hash
    /// * `Err(DomainError)` - Database error occurred
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError>;

    /// Flip a still-valid token to invalid
    ///
    /// The first invalidation reason is kept; a row that is already invalid is
    /// left untouched.
    ///
    /// # Returns
    /// * `Ok(true)` - This call invalidated the token
    /// * `Ok(false)` - Token not found or already invalid
    /// * `Err(DomainError)` - Update failed
    async fn invalidate_token(
        &self,
        token_hash: &str,
        reason: InvalidationReason,
    ) -> Result<bool, DomainError>;

    /// Invalidate every token of a session and stamp the family revocation
    ///
    /// Applies to all rows of the session, including ones already invalid.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows that were still valid before the call
    /// * `Err(DomainError)` - Update failed
    async fn invalidate_session(
        &self,
        session_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError>;

    /// Find every token ever issued for a session, oldest first
    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<RefreshToken>, DomainError>;

    /// Invalidate all valid refresh tokens for a principal
    ///
    /// Stamps the family revocation on every row of the principal, like
    /// `invalidate_session` does for one session, so a rotation that is
    /// issuing a successor at the same time sees the revocation.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of tokens invalidated
    /// * `Err(DomainError)` - Revocation failed
    async fn revoke_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError>;

    /// Delete tokens that expired before `cutoff`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows deleted
    /// * `Err(DomainError)` - Deletion failed
    async fn delete_expired_tokens(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Check if a token exists and is active
    async fn is_token_active(&self, token_hash: &str) -> Result<bool, DomainError> {
        match self.find_refresh_token(token_hash).await? {
            Some(token) => Ok(token.is_active()),
            None => Ok(false),
        }
    }

    /// Count active tokens of a session
    async fn count_active_in_session(&self, session_id: Uuid) -> Result<usize, DomainError> {
        let tokens = self.find_by_session(session_id).await?;
        Ok(tokens.iter().filter(|t| t.is_active()).count())
    }
}
