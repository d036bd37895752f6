//! End-to-end account and session flow through the public API

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mv_core::{
    AuthError, AuthService, AuthServiceConfig, DomainError, InvalidationReason, RefreshToken,
    RegistrationRequest, TokenError, TokenRepository, TokenService, TokenServiceConfig, User,
    UserRepository,
};

#[derive(Default)]
struct Ledger {
    rows: Mutex<HashMap<String, RefreshToken>>,
}

#[async_trait]
impl TokenRepository for Ledger {
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&token.token_hash) {
            return Err(DomainError::Validation {
                message: "duplicate token".to_string(),
            });
        }
        rows.insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        Ok(self.rows.lock().unwrap().get(token_hash).cloned())
    }

    async fn invalidate_token(
        &self,
        token_hash: &str,
        reason: InvalidationReason,
    ) -> Result<bool, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(token_hash) {
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
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for token in rows.values_mut().filter(|t| t.session_id == session_id) {
            if token.is_valid {
                count += 1;
            }
            token.revoke_family(reason);
        }
        Ok(count)
    }

    async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<RefreshToken>, DomainError> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<_> = rows
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
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for token in rows.values_mut().filter(|t| t.user_id == user_id && t.is_valid) {
            token.invalidate(reason);
            count += 1;
        }
        Ok(count)
    }

    async fn delete_expired_tokens(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, t| t.expires_at >= cutoff);
        Ok(before - rows.len())
    }
}

#[derive(Default)]
struct Accounts {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for Accounts {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.matches_username(username)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.matches_username(username)))
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }
}

fn auth_service() -> (AuthService<Accounts, Ledger>, Arc<Ledger>) {
    let users = Arc::new(Accounts::default());
    let ledger = Arc::new(Ledger::default());
    let tokens = Arc::new(TokenService::new(
        ledger.clone(),
        users.clone(),
        TokenServiceConfig::default(),
    ));
    let config = AuthServiceConfig {
        bcrypt_cost: 4,
        ..AuthServiceConfig::default()
    };
    (AuthService::new(users, tokens, config), ledger)
}

fn registration(username: &str) -> RegistrationRequest {
    RegistrationRequest {
        username: username.to_string(),
        name: "Villa Guest".to_string(),
        password: "s3cret-pass".to_string(),
        role: "customer".to_string(),
    }
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let (auth, ledger) = auth_service();

    let principal = auth.register(registration("guest")).await.unwrap();
    assert_eq!(principal.roles, vec!["customer".to_string()]);
    assert!(!auth.is_unique_username("GUEST").await.unwrap());

    let login = auth.login("guest", "s3cret-pass").await.unwrap();
    assert_eq!(login.principal.id, principal.id);

    let claims = auth
        .token_service()
        .verify_access_token(&login.tokens.access_token)
        .unwrap();
    assert_eq!(claims.sid, login.tokens.session_id.to_string());

    let rotated = auth
        .refresh(&login.tokens.access_token, &login.tokens.refresh_token)
        .await
        .unwrap();
    assert_eq!(rotated.session_id, login.tokens.session_id);
    assert_ne!(rotated.refresh_token, login.tokens.refresh_token);

    let revoked = auth.logout(&rotated.refresh_token).await.unwrap();
    assert_eq!(revoked, 1);
    assert_eq!(
        ledger
            .count_active_in_session(login.tokens.session_id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_replayed_refresh_token_ends_session() {
    let (auth, ledger) = auth_service();
    auth.register(registration("replayer")).await.unwrap();
    let login = auth.login("replayer", "s3cret-pass").await.unwrap();

    let rotated = auth
        .refresh(&login.tokens.access_token, &login.tokens.refresh_token)
        .await
        .unwrap();

    let replay = auth
        .refresh(&login.tokens.access_token, &login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(replay.token_error(), Some(&TokenError::ReuseDetected));

    let after = auth
        .refresh(&rotated.access_token, &rotated.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(after.token_error(), Some(&TokenError::ReuseDetected));

    let family = ledger.find_by_session(login.tokens.session_id).await.unwrap();
    assert_eq!(family.len(), 2);
    assert!(family.iter().all(|t| !t.is_valid && t.is_family_revoked()));
}

#[tokio::test]
async fn test_clients_see_one_code_for_every_rotation_rejection() {
    let (auth, _) = auth_service();
    auth.register(registration("codes")).await.unwrap();
    let login = auth.login("codes", "s3cret-pass").await.unwrap();

    let unknown = auth
        .refresh(&login.tokens.access_token, "never-issued")
        .await
        .unwrap_err();
    let malformed = auth
        .refresh("not-a-jwt", &login.tokens.refresh_token)
        .await
        .unwrap_err();

    let unknown = unknown.token_error().unwrap();
    let malformed = malformed.token_error().unwrap();
    assert_ne!(unknown, malformed);
    assert_eq!(unknown.client_code(), malformed.client_code());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (auth, _) = auth_service();
    auth.register(registration("known")).await.unwrap();

    let wrong_password = auth.login("known", "wrong-pass").await.unwrap_err();
    let unknown_user = auth.login("nobody", "s3cret-pass").await.unwrap_err();

    assert!(matches!(
        wrong_password,
        DomainError::Auth(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        unknown_user,
        DomainError::Auth(AuthError::InvalidCredentials)
    ));
}
