//! bcrypt hashing off the async executor

use tokio::task;

use crate::errors::DomainError;

/// Hashes a password with the given bcrypt cost on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> Result<String, DomainError> {
    let password = password.to_owned();

    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Password hashing task failed: {}", e),
        })?
        .map_err(|e| DomainError::Internal {
            message: format!("Password hashing failed: {}", e),
        })
}

/// Checks a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, DomainError> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    let verified = task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Password verification task failed: {}", e),
        })?;

    Ok(verified.unwrap_or(false))
}
