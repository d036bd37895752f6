//! Main authentication service implementation

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::entities::token::TokenPair;
use crate::domain::entities::user::{Principal, User};
use crate::domain::value_objects::{LoginResponse, RegistrationRequest};
use crate::errors::{AuthError, DomainError, DomainResult, ValidationError};
use crate::repositories::audit::NoOpAuditLogRepository;
use crate::repositories::{AuditLogRepository, TokenRepository, UserRepository};
use crate::services::audit::AuditService;
use crate::services::token::TokenService;

use super::config::AuthServiceConfig;
use super::password::{hash_password, verify_password};

/// Password hashed once per service to spend bcrypt time on unknown usernames
const DUMMY_PASSWORD: &str = "magic-villa-unknown-user";

/// Authentication service for registration, login and the token lifecycle
pub struct AuthService<U, T, A = NoOpAuditLogRepository>
where
    U: UserRepository,
    T: TokenRepository,
    A: AuditLogRepository + 'static,
{
    /// Credential store
    user_repository: Arc<U>,
    /// Token authority
    token_service: Arc<TokenService<T, U>>,
    /// Optional audit service for logging security events
    audit_service: Option<Arc<AuditService<A>>>,
    /// Service configuration
    config: AuthServiceConfig,
    /// Hash checked when the username is unknown, at the configured cost
    dummy_hash: OnceCell<String>,
}

impl<U, T, A> AuthService<U, T, A>
where
    U: UserRepository,
    T: TokenRepository,
    A: AuditLogRepository + 'static,
{
    /// Create a new authentication service
    pub fn new(
        user_repository: Arc<U>,
        token_service: Arc<TokenService<T, U>>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            user_repository,
            token_service,
            audit_service: None,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create a new authentication service with audit logging
    pub fn with_audit(
        user_repository: Arc<U>,
        token_service: Arc<TokenService<T, U>>,
        audit_service: Arc<AuditService<A>>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            user_repository,
            token_service,
            audit_service: Some(audit_service),
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    /// The token authority this service issues sessions through
    pub fn token_service(&self) -> &Arc<TokenService<T, U>> {
        &self.token_service
    }

    /// Register a new account with a single role
    ///
    /// # Returns
    ///
    /// * `Ok(Principal)` - The newly created principal
    /// * `Err(DomainError)` - Validation failed, the username is taken, or
    ///   the user could not be stored
    pub async fn register(&self, request: RegistrationRequest) -> DomainResult<Principal> {
        let username = request.username.trim().to_string();

        if let Err(e) = self.validate_registration(&username, &request) {
            self.audit_registration(&username, None, Some("validation_failed")).await;
            return Err(e);
        }

        if self.user_repository.exists_by_username(&username).await? {
            debug!(username = %username, "Registration rejected: username taken");
            self.audit_registration(&username, None, Some("username_taken")).await;
            return Err(AuthError::UsernameTaken.into());
        }

        let password_hash = hash_password(&request.password, self.config.bcrypt_cost).await?;
        let user = User::new(
            username.clone(),
            request.name.trim().to_string(),
            password_hash,
            request.role.trim().to_string(),
        );

        let user = match self.user_repository.create(user).await {
            Ok(user) => user,
            Err(e) => {
                self.audit_registration(&username, None, Some("storage_failed")).await;
                return Err(e);
            }
        };

        info!(user_id = %user.id, username = %user.username, "User registered");
        self.audit_registration(&user.username, Some(user.id), None).await;

        Ok(user.principal())
    }

    /// Authenticate with username and password and start a session
    ///
    /// Unknown usernames and wrong passwords both yield
    /// `AuthError::InvalidCredentials`, and both pay for one bcrypt
    /// verification.
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<LoginResponse> {
        let username = username.trim();

        let user = match self.user_repository.find_by_username(username).await? {
            Some(user) => user,
            None => {
                let dummy_hash = self
                    .dummy_hash
                    .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.config.bcrypt_cost))
                    .await?;
                verify_password(password, dummy_hash).await?;

                self.audit_login(username, None, None, Some("invalid_credentials")).await;
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_password(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Login rejected: wrong password");
            self.audit_login(username, Some(user.id), None, Some("invalid_credentials"))
                .await;
            return Err(AuthError::InvalidCredentials.into());
        }

        let principal = user.principal();
        let tokens = self.token_service.issue(&principal).await?;

        self.audit_login(&principal.username, Some(principal.id), Some(tokens.session_id), None)
            .await;

        Ok(LoginResponse { principal, tokens })
    }

    /// Exchange an access/refresh token pair for a new pair
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> DomainResult<TokenPair> {
        match self.token_service.rotate(access_token, refresh_token).await {
            Ok(pair) => {
                if let Some(audit) = &self.audit_service {
                    let user_id = self
                        .token_service
                        .decode_for_refresh(&pair.access_token)
                        .ok()
                        .and_then(|claims| claims.user_id().ok());
                    audit.log_refresh_success(user_id, pair.session_id).await;
                }
                Ok(pair)
            }
            Err(e) => {
                if let (Some(audit), Some(token_error)) = (&self.audit_service, e.token_error()) {
                    let session_id = self
                        .token_service
                        .decode_for_refresh(access_token)
                        .ok()
                        .and_then(|claims| claims.session_id().ok());
                    audit.log_refresh_failure(token_error, session_id).await;
                }
                Err(e)
            }
        }
    }

    /// End the session a refresh token belongs to
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of tokens that were still valid
    pub async fn logout(&self, refresh_token: &str) -> DomainResult<usize> {
        let session_id = self
            .token_service
            .lookup(refresh_token)
            .await?
            .map(|token| token.session_id);

        let revoked = self.token_service.revoke_session(refresh_token).await?;

        if let Some(audit) = &self.audit_service {
            audit.log_logout(session_id, revoked).await;
        }

        Ok(revoked)
    }

    /// Whether a username is still free (case-insensitive)
    pub async fn is_unique_username(&self, username: &str) -> DomainResult<bool> {
        let taken = self.user_repository.exists_by_username(username.trim()).await?;
        Ok(!taken)
    }

    fn validate_registration(
        &self,
        username: &str,
        request: &RegistrationRequest,
    ) -> DomainResult<()> {
        if !self.config.allow_registration {
            return Err(AuthError::RegistrationFailed {
                reason: "registration is disabled".to_string(),
            }
            .into());
        }

        if username.is_empty() {
            return Err(required("username"));
        }
        if request.password.is_empty() {
            return Err(required("password"));
        }
        if request.role.trim().is_empty() {
            return Err(required("role"));
        }

        let length = request.password.chars().count();
        if length < self.config.min_password_length {
            return Err(ValidationError::InvalidLength {
                field: "password".to_string(),
                min: self.config.min_password_length,
                actual: length,
            }
            .into());
        }

        Ok(())
    }

    async fn audit_registration(&self, username: &str, user_id: Option<Uuid>, failure: Option<&str>) {
        if let Some(audit) = &self.audit_service {
            audit.log_registration(username, user_id, failure).await;
        }
    }

    async fn audit_login(
        &self,
        username: &str,
        user_id: Option<Uuid>,
        session_id: Option<Uuid>,
        failure: Option<&str>,
    ) {
        if let Some(audit) = &self.audit_service {
            audit.log_login(username, user_id, session_id, failure).await;
        }
    }
}

fn required(field: &str) -> DomainError {
    DomainError::ValidationErr(ValidationError::RequiredField {
        field: field.to_string(),
    })
}
