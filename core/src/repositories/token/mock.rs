//! Mock implementation of TokenRepository for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::{InvalidationReason, RefreshToken};
use crate::errors::DomainError;

use super::TokenRepository;

/// In-memory ledger keyed by token hash
#[derive(Clone)]
pub struct MockTokenRepository {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl MockTokenRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Overwrite a stored row, bypassing ledger rules
    pub async fn put(&self, token: RefreshToken) {
        self.tokens.write().await.insert(token.token_hash.clone(), token);
    }

    /// Number of rows in the ledger
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

impl Default for MockTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&token.token_hash) {
            return Err(DomainError::Validation {
                message: "Token already exists".to_string(),
            });
        }

        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn invalidate_token(
        &self,
        token_hash: &str,
        reason: InvalidationReason,
    ) -> Result<bool, DomainError> {
        let mut tokens = self.tokens.write().await;

        match tokens.get_mut(token_hash) {
            Some(token) if token.is_valid => {
                token.invalidate(reason);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn invalidate_session(
        &self,
        session_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let mut count = 0;

        for token in tokens.values_mut().filter(|t| t.session_id == session_id) {
            if token.is_valid {
                count += 1;
            }
            token.revoke_family(reason);
        }

        Ok(count)
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<RefreshToken>, DomainError> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<RefreshToken> = tokens
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn revoke_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: InvalidationReason,
    ) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let mut count = 0;

        for token in tokens.values_mut().filter(|t| t.user_id == user_id) {
            if token.is_valid {
                count += 1;
            }
            token.revoke_family(reason);
        }

        Ok(count)
    }

    async fn delete_expired_tokens(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let initial_count = tokens.len();

        tokens.retain(|_, token| token.expires_at >= cutoff);

        Ok(initial_count - tokens.len())
    }
}
