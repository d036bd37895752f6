//! User repository trait defining the interface for the credential store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::user::User;
use crate::errors::DomainError;

/// Repository trait for User entity persistence operations
///
/// Usernames are unique case-insensitively; lookups by username must ignore
/// case the same way.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by username, ignoring case
    ///
    /// # Returns
    /// * `Ok(Some(User))` - User found
    /// * `Ok(None)` - No user with that username
    /// * `Err(DomainError)` - Database or other error occurred
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Find a user by their unique ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;

    /// Check whether a username is already taken, ignoring case
    async fn exists_by_username(&self, username: &str) -> Result<bool, DomainError>;

    /// Create a new user together with its roles
    ///
    /// # Returns
    /// * `Ok(User)` - The created user
    /// * `Err(DomainError)` - Creation failed (e.g., duplicate username)
    async fn create(&self, user: User) -> Result<User, DomainError>;
}
