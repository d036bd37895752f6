//! Token entities for JWT-based authentication with rotating refresh tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Principal;

/// Claims structure for the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: String,

    /// Username of the principal
    pub name: String,

    /// Primary role of the principal, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Session ID shared by every token of one login
    pub sid: String,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,
}

impl Claims {
    /// Creates new claims for an access token
    ///
    /// # Arguments
    ///
    /// * `principal` - The authenticated principal
    /// * `session_id` - Session the token belongs to
    /// * `issuer` - Value of the `iss` claim
    /// * `audience` - Value of the `aud` claim
    /// * `ttl` - Lifetime of the token
    pub fn new_access_token(
        principal: &Principal,
        session_id: Uuid,
        issuer: &str,
        audience: &str,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiry = expires_after(now, ttl);

        Self {
            sub: principal.id.to_string(),
            name: principal.username.clone(),
            role: principal.primary_role().map(str::to_string),
            sid: session_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiry.timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets the principal ID from the claims
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }

    /// Gets the session ID from the claims
    pub fn session_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sid)
    }
}

/// Why a refresh token stopped being valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// Rotated away by a successful refresh
    Consumed,
    /// Presented after its expiry
    Expired,
    /// Presented with a malformed or mismatching access token
    Rejected,
    /// Revoked with its whole session after reuse was detected
    FamilyRevoked,
    /// Revoked with its whole session at logout
    LoggedOut,
}

impl InvalidationReason {
    /// Convert to string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumed => "consumed",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
            Self::FamilyRevoked => "family_revoked",
            Self::LoggedOut => "logged_out",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "consumed" => Some(Self::Consumed),
            "expired" => Some(Self::Expired),
            "rejected" => Some(Self::Rejected),
            "family_revoked" => Some(Self::FamilyRevoked),
            "logged_out" => Some(Self::LoggedOut),
            _ => None,
        }
    }
}

/// Lifecycle state of a refresh token row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Consumed,
    Expired,
    Revoked,
}

/// Refresh token entity stored in the ledger
///
/// Rows are never deleted by rotation; they are only flipped to invalid so a
/// replayed token can still be recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique identifier for the row
    pub id: Uuid,

    /// Principal this token belongs to
    pub user_id: Uuid,

    /// Session (token family) this token belongs to
    pub session_id: Uuid,

    /// SHA-256 hex digest of the token string
    pub token_hash: String,

    /// Timestamp when the token was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Whether the token can still be exchanged
    pub is_valid: bool,

    /// When the token was first invalidated
    pub invalidated_at: Option<DateTime<Utc>>,

    /// Why the token was first invalidated
    pub invalidation_reason: Option<InvalidationReason>,

    /// When the token's whole session was revoked
    pub family_revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Creates a new, valid refresh token row
    ///
    /// # Arguments
    ///
    /// * `user_id` - The principal's UUID
    /// * `session_id` - Session the token continues
    /// * `token_hash` - The hashed token value
    /// * `ttl` - Lifetime of the token
    pub fn new(user_id: Uuid, session_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            token_hash,
            created_at: now,
            expires_at: expires_after(now, ttl),
            is_valid: true,
            invalidated_at: None,
            invalidation_reason: None,
            family_revoked_at: None,
        }
    }

    /// Checks if the refresh token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// A token is active if it is still flagged valid and hasn't expired
    pub fn is_active(&self) -> bool {
        self.is_valid && !self.is_expired()
    }

    /// Marks the token invalid, keeping the first recorded reason
    pub fn invalidate(&mut self, reason: InvalidationReason) {
        if self.invalidation_reason.is_none() {
            self.invalidated_at = Some(Utc::now());
            self.invalidation_reason = Some(reason);
        }
        self.is_valid = false;
    }

    /// Marks the token as part of a revoked session
    pub fn revoke_family(&mut self, reason: InvalidationReason) {
        self.invalidate(reason);
        self.family_revoked_at.get_or_insert_with(Utc::now);
    }

    /// Whether the token's session has been revoked
    pub fn is_family_revoked(&self) -> bool {
        self.family_revoked_at.is_some()
    }

    /// Lifecycle state derived from the stored flags
    pub fn state(&self) -> RefreshTokenState {
        if self.is_valid {
            return RefreshTokenState::Active;
        }
        match self.invalidation_reason {
            Some(InvalidationReason::Consumed) => RefreshTokenState::Consumed,
            Some(InvalidationReason::Expired) => RefreshTokenState::Expired,
            _ => RefreshTokenState::Revoked,
        }
    }
}

/// Instant `ttl` after `now`, clamped to the latest representable time
fn expires_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// Opaque refresh token
    pub refresh_token: String,

    /// Session both tokens belong to
    pub session_id: Uuid,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        session_id: Uuid,
        access_expires_in: i64,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            session_id,
            access_expires_in,
            refresh_expires_in,
        }
    }
}
