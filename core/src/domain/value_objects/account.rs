//! Request and response shapes for registration and login.

use serde::{Deserialize, Serialize};

use crate::domain::entities::token::TokenPair;
use crate::domain::entities::user::Principal;

/// Data needed to register a new account
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Successful login: who logged in and the tokens for the new session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub principal: Principal,
    pub tokens: TokenPair,
}
