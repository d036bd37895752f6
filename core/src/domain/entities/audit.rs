//! Audit log entity for recording authentication and token lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Event types recorded by the account flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    UserRegistered,
    RegistrationFailure,
    LoginSuccess,
    LoginFailure,
    TokenRefreshed,
    RefreshTokenFailure,
    /// A consumed refresh token was replayed; the session was revoked
    RefreshTokenReuse,
    Logout,
}

impl AuditEventType {
    /// Convert to string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "USER_REGISTERED",
            Self::RegistrationFailure => "REGISTRATION_FAILURE",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::RefreshTokenFailure => "REFRESH_TOKEN_FAILURE",
            Self::RefreshTokenReuse => "REFRESH_TOKEN_REUSE",
            Self::Logout => "LOGOUT",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER_REGISTERED" => Some(Self::UserRegistered),
            "REGISTRATION_FAILURE" => Some(Self::RegistrationFailure),
            "LOGIN_SUCCESS" => Some(Self::LoginSuccess),
            "LOGIN_FAILURE" => Some(Self::LoginFailure),
            "TOKEN_REFRESHED" => Some(Self::TokenRefreshed),
            "REFRESH_TOKEN_FAILURE" => Some(Self::RefreshTokenFailure),
            "REFRESH_TOKEN_REUSE" => Some(Self::RefreshTokenReuse),
            "LOGOUT" => Some(Self::Logout),
            _ => None,
        }
    }

    /// Whether the event should be routed to security monitoring
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::RefreshTokenReuse)
    }
}

/// Represents an audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLog {
    /// Unique identifier for the log entry
    pub id: Uuid,

    /// Type of event
    pub event_type: AuditEventType,

    /// Principal involved, if known
    pub user_id: Option<Uuid>,

    /// Session involved, if known
    pub session_id: Option<Uuid>,

    /// Username as presented by the caller
    pub username: Option<String>,

    /// Whether the action succeeded
    pub success: bool,

    /// Machine readable failure reason
    pub failure_reason: Option<String>,

    /// Extra structured context
    pub metadata: Option<JsonValue>,

    /// Timestamp of the event
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Creates a new audit entry
    pub fn new(event_type: AuditEventType, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            user_id: None,
            session_id: None,
            username: None,
            success,
            failure_reason: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches the principal
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attaches the session
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Attaches the presented username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Attaches a failure reason
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    /// Attaches structured metadata
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
