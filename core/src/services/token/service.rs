//! Main token service implementation

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{Claims, InvalidationReason, RefreshToken, TokenPair};
use crate::domain::entities::user::Principal;
use crate::errors::{DomainError, TokenError};
use crate::repositories::{TokenRepository, UserRepository};

use super::cleanup::retention_cutoff;
use super::config::TokenServiceConfig;

const REFRESH_TOKEN_LENGTH: usize = 48;

/// Issues access tokens and rotates single-use refresh tokens
///
/// Access tokens are stateless JWTs. Refresh tokens are opaque random strings
/// whose SHA-256 digest is recorded in the ledger together with the session
/// they belong to. Every successful rotation consumes the presented token and
/// issues a successor in the same session; presenting a consumed token again
/// revokes the whole session.
pub struct TokenService<R: TokenRepository, U: UserRepository> {
    pub(crate) repository: Arc<R>,
    users: Arc<U>,
    config: TokenServiceConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    refresh_validation: Validation,
}

impl<R: TokenRepository, U: UserRepository> TokenService<R, U> {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `repository` - Refresh token ledger
    /// * `users` - Credential store used to re-load principals on rotation
    /// * `config` - Token service configuration
    pub fn new(repository: Arc<R>, users: Arc<U>, config: TokenServiceConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        // Refresh exists to renew expired access tokens, so only the
        // signature and the token's origin are checked here.
        let mut refresh_validation = validation.clone();
        refresh_validation.validate_exp = false;
        refresh_validation.validate_nbf = false;

        Self {
            repository,
            users,
            config,
            encoding_key,
            decoding_key,
            validation,
            refresh_validation,
        }
    }

    /// Starts a new session for an authenticated principal
    ///
    /// Mints an access token and a refresh token sharing a fresh session ID
    /// and records the refresh token in the ledger.
    pub async fn issue(&self, principal: &Principal) -> Result<TokenPair, DomainError> {
        self.ensure_lifetimes_in_range()?;

        let session_id = Uuid::new_v4();
        let refresh_token = self.store_refresh_token(principal.id, session_id).await?;
        let access_token = self.mint_access_token(principal, session_id)?;

        info!(
            user_id = %principal.id,
            session_id = %session_id,
            "Issued new token session"
        );

        Ok(self.token_pair(access_token, refresh_token, session_id))
    }

    /// Exchanges an access/refresh token pair for a new pair
    ///
    /// Checks run in a fixed order and each one is a terminal rejection:
    ///
    /// 1. the refresh token must exist in the ledger
    /// 2. the access token must carry our signature (expiry is ignored)
    /// 3. both tokens must name the same principal and session
    /// 4. the refresh token must not have been used before; reuse revokes
    ///    the whole session
    /// 5. the refresh token must not be expired
    ///
    /// The presented token is then consumed with a compare-and-set before
    /// the successor is issued, so two concurrent rotations of the same token
    /// can never both succeed.
    pub async fn rotate(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, DomainError> {
        let token_hash = Self::hash_token(refresh_token);

        let presented = match self.repository.find_refresh_token(&token_hash).await? {
            Some(token) => token,
            None => return Err(self.reject(TokenError::NoSuchToken, None)),
        };

        let claims = match self.decode_for_refresh(access_token) {
            Ok(claims) => claims,
            Err(_) => {
                self.repository
                    .invalidate_token(&token_hash, InvalidationReason::Rejected)
                    .await?;
                return Err(self.reject(TokenError::MalformedAccessToken, Some(&presented)));
            }
        };

        let claimed_ids = claims.user_id().ok().zip(claims.session_id().ok());
        if claimed_ids != Some((presented.user_id, presented.session_id)) {
            self.repository
                .invalidate_token(&token_hash, InvalidationReason::Rejected)
                .await?;
            return Err(self.reject(TokenError::TokenSessionMismatch, Some(&presented)));
        }

        if !presented.is_valid {
            return Err(self.revoke_for_reuse(&presented).await?);
        }

        if presented.is_expired() {
            self.repository
                .invalidate_token(&token_hash, InvalidationReason::Expired)
                .await?;
            return Err(self.reject(TokenError::Expired, Some(&presented)));
        }

        self.ensure_lifetimes_in_range()?;

        let consumed = self
            .repository
            .invalidate_token(&token_hash, InvalidationReason::Consumed)
            .await?;
        if !consumed {
            // Lost the race against another rotation of the same token.
            return Err(self.revoke_for_reuse(&presented).await?);
        }

        let principal = match self.users.find_by_id(presented.user_id).await? {
            Some(user) => user.principal(),
            None => return Err(self.reject(TokenError::PrincipalGone, Some(&presented))),
        };

        let successor = self
            .store_refresh_token(principal.id, presented.session_id)
            .await?;

        let revoked_meanwhile = self
            .repository
            .find_refresh_token(&token_hash)
            .await?
            .is_some_and(|token| token.is_family_revoked());
        if revoked_meanwhile {
            self.repository
                .invalidate_token(&Self::hash_token(&successor), InvalidationReason::FamilyRevoked)
                .await?;
            return Err(self.revoke_for_reuse(&presented).await?);
        }

        let access_token = self.mint_access_token(&principal, presented.session_id)?;

        debug!(
            user_id = %principal.id,
            session_id = %presented.session_id,
            "Rotated refresh token"
        );

        Ok(self.token_pair(access_token, successor, presented.session_id))
    }

    /// Decodes an access token presented for refresh
    ///
    /// The signature, issuer and audience are verified; expiry and
    /// not-before are not.
    pub fn decode_for_refresh(&self, access_token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(access_token, &self.decoding_key, &self.refresh_validation)
            .map(|data| data.claims)
            .map_err(|_| DomainError::Token(TokenError::MalformedAccessToken))
    }

    /// Verifies an access token and returns the claims
    ///
    /// # Returns
    ///
    /// * `Ok(Claims)` - The decoded claims if valid
    /// * `Err(TokenError::AccessTokenExpired)` - Signature fine but expired
    /// * `Err(TokenError::InvalidAccessToken)` - Anything else
    pub fn verify_access_token(&self, access_token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(access_token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::Token(TokenError::AccessTokenExpired),
                _ => DomainError::Token(TokenError::InvalidAccessToken),
            })
    }

    /// Revokes the session a refresh token belongs to (logout)
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of rows that were still valid
    /// * `Err(TokenError::NoSuchToken)` - Token unknown to the ledger
    pub async fn revoke_session(&self, refresh_token: &str) -> Result<usize, DomainError> {
        let token_hash = Self::hash_token(refresh_token);

        let token = self
            .repository
            .find_refresh_token(&token_hash)
            .await?
            .ok_or(DomainError::Token(TokenError::NoSuchToken))?;

        let revoked = self
            .repository
            .invalidate_session(token.session_id, InvalidationReason::LoggedOut)
            .await?;

        info!(
            user_id = %token.user_id,
            session_id = %token.session_id,
            revoked,
            "Session revoked"
        );

        Ok(revoked)
    }

    /// Looks up the ledger row of a refresh token without changing it
    pub async fn lookup(&self, refresh_token: &str) -> Result<Option<RefreshToken>, DomainError> {
        self.repository
            .find_refresh_token(&Self::hash_token(refresh_token))
            .await
    }

    /// Revokes every valid refresh token of a principal
    pub async fn revoke_all_for_principal(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let revoked = self
            .repository
            .revoke_all_user_tokens(user_id, InvalidationReason::LoggedOut)
            .await?;

        info!(user_id = %user_id, revoked, "Revoked all sessions of principal");
        Ok(revoked)
    }

    /// Deletes ledger rows whose expiry passed more than `retention` ago
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of tokens cleaned up
    pub async fn cleanup_expired_tokens(&self, retention: Duration) -> Result<usize, DomainError> {
        self.repository
            .delete_expired_tokens(retention_cutoff(Utc::now(), retention))
            .await
    }

    /// Hashes a token for storage and lookup
    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Fails when a configured lifetime would push an expiry past the
    /// latest representable instant
    fn ensure_lifetimes_in_range(&self) -> Result<(), DomainError> {
        let now = Utc::now();
        let in_range = [self.config.access_token_ttl, self.config.refresh_token_ttl]
            .into_iter()
            .all(|ttl| now.checked_add_signed(ttl).is_some());

        if in_range {
            Ok(())
        } else {
            Err(DomainError::Internal {
                message: "configured token lifetime is out of range".to_string(),
            })
        }
    }

    fn mint_access_token(
        &self,
        principal: &Principal,
        session_id: Uuid,
    ) -> Result<String, DomainError> {
        let claims = Claims::new_access_token(
            principal,
            session_id,
            &self.config.issuer,
            &self.config.audience,
            self.config.access_token_ttl,
        );
        self.encode_jwt(&claims)
    }

    /// Encodes claims into a JWT
    pub(crate) fn encode_jwt(&self, claims: &Claims) -> Result<String, DomainError> {
        let header = Header::new(self.config.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<String, DomainError> {
        let token_string = generate_token_string();
        let token = RefreshToken::new(
            user_id,
            session_id,
            Self::hash_token(&token_string),
            self.config.refresh_token_ttl,
        );

        self.repository.save_refresh_token(token).await?;
        Ok(token_string)
    }

    async fn revoke_for_reuse(&self, presented: &RefreshToken) -> Result<DomainError, DomainError> {
        let revoked = self
            .repository
            .invalidate_session(presented.session_id, InvalidationReason::FamilyRevoked)
            .await?;

        warn!(
            target: "security",
            user_id = %presented.user_id,
            session_id = %presented.session_id,
            revoked,
            "Refresh token reuse detected, session revoked"
        );

        Ok(DomainError::Token(TokenError::ReuseDetected))
    }

    fn reject(&self, error: TokenError, presented: Option<&RefreshToken>) -> DomainError {
        match presented {
            Some(token) => debug!(
                reason = error.as_str(),
                user_id = %token.user_id,
                session_id = %token.session_id,
                "Refresh rejected"
            ),
            None => debug!(reason = error.as_str(), "Refresh rejected"),
        }
        DomainError::Token(error)
    }

    fn token_pair(&self, access_token: String, refresh_token: String, session_id: Uuid) -> TokenPair {
        TokenPair::new(
            access_token,
            refresh_token,
            session_id,
            self.config.access_expires_in(),
            self.config.refresh_expires_in(),
        )
    }
}

fn generate_token_string() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
