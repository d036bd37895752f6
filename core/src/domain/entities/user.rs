//! User entity representing a registered account in the MagicVilla system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credential store row for a registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// Login name, unique case-insensitively
    pub username: String,

    /// Display name
    pub name: String,

    /// bcrypt hash of the password
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Roles granted to the user, in assignment order
    pub roles: Vec<String>,

    /// Timestamp when the user was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new User instance with a single role
    pub fn new(username: String, name: String, password_hash: String, role: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            name,
            password_hash,
            roles: vec![role],
            created_at: now,
            updated_at: now,
        }
    }

    /// Grants an additional role
    pub fn add_role(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
            self.updated_at = Utc::now();
        }
    }

    /// Whether `username` names this user (case-insensitive)
    pub fn matches_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    /// Projects the user to the identity carried in tokens
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Authenticated identity the token authority issues tokens for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    /// The role embedded in access tokens: the first one granted
    pub fn primary_role(&self) -> Option<&str> {
        self.roles.first().map(String::as_str)
    }
}
