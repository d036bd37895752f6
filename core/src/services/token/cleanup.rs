//! Periodic removal of expired refresh tokens from the ledger
//!
//! Invalid rows are kept after rotation so that reuse can be detected. Once a
//! row is past its expiry plus the retention window it can no longer matter
//! for detection and is deleted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mv_shared::{CleanupConfig, MAX_RETENTION_DAYS};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::errors::DomainError;
use crate::repositories::TokenRepository;

/// Configuration for token cleanup service
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// How long expired rows are kept before deletion
    pub retention: Duration,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            retention: Duration::days(7),
            enabled: true,
        }
    }
}

impl TryFrom<&CleanupConfig> for TokenCleanupConfig {
    type Error = DomainError;

    fn try_from(config: &CleanupConfig) -> Result<Self, Self::Error> {
        let retention = Duration::try_days(config.retention_days)
            .filter(|_| (0..=MAX_RETENTION_DAYS).contains(&config.retention_days))
            .ok_or_else(|| DomainError::Validation {
                message: format!(
                    "cleanup retention must be between 0 and {} days, got {}",
                    MAX_RETENTION_DAYS, config.retention_days
                ),
            })?;

        Ok(Self {
            interval_seconds: config.interval_seconds,
            retention,
            enabled: config.enabled,
        })
    }
}

/// Oldest expiry that is still kept, never earlier than the minimum instant
pub(crate) fn retention_cutoff(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Service for deleting expired refresh tokens
pub struct TokenCleanupService<R: TokenRepository + 'static> {
    repository: Arc<R>,
    config: TokenCleanupConfig,
}

impl<R: TokenRepository> TokenCleanupService<R> {
    /// Create a new token cleanup service
    pub fn new(repository: Arc<R>, config: TokenCleanupConfig) -> Self {
        Self { repository, config }
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupResult)` - Summary of cleanup operations
    /// * `Err(DomainError)` - If cleanup fails
    pub async fn run_cleanup(&self) -> Result<CleanupResult, DomainError> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        let cutoff = retention_cutoff(Utc::now(), self.config.retention);
        let mut result = CleanupResult::default();

        match self.repository.delete_expired_tokens(cutoff).await {
            Ok(count) => {
                result.expired_tokens_deleted = count;
                info!(deleted = count, cutoff = %cutoff, "Deleted expired refresh tokens");
            }
            Err(e) => {
                error!("Failed to cleanup expired tokens: {}", e);
                result.errors.push(format!("Token cleanup error: {}", e));
            }
        }

        Ok(result)
    }

    /// Start the cleanup service as a background task
    ///
    /// Returns `None` when cleanup is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Token cleanup service is disabled");
            return None;
        }

        let period = std::time::Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "Token cleanup service started - will run every {} seconds",
                self.config.interval_seconds
            );

            let mut interval_timer = tokio::time::interval(period);

            loop {
                interval_timer.tick().await;

                match self.run_cleanup().await {
                    Ok(result) if !result.is_success() => {
                        warn!("Cleanup completed with errors: {:?}", result.errors);
                    }
                    Ok(_) => {}
                    Err(e) => error!("Token cleanup cycle failed: {}", e),
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired refresh tokens deleted
    pub expired_tokens_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
