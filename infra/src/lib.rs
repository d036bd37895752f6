//! # Infrastructure Layer
//!
//! Concrete implementations behind the MagicVilla core: MySQL repositories
//! built on SQLx, the tracing subscriber, and [`initialize`], which wires the
//! token authority and account flow together from an [`AppConfig`].
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)

use std::sync::Arc;

use mv_core::errors::DomainError;
use mv_core::services::{
    AuditService, AuditServiceConfig, AuthService, AuthServiceConfig, TokenCleanupConfig,
    TokenCleanupService, TokenService, TokenServiceConfig,
};
use mv_shared::{AppConfig, ConfigError};
use tokio::task::JoinHandle;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Tracing subscriber setup
pub mod telemetry;

#[cfg(feature = "mysql")]
use database::{DatabasePool, MySqlAuditLogRepository, MySqlTokenRepository, MySqlUserRepository};

/// Token authority backed by MySQL
#[cfg(feature = "mysql")]
pub type MySqlTokenService = TokenService<MySqlTokenRepository, MySqlUserRepository>;

/// Account flow backed by MySQL
#[cfg(feature = "mysql")]
pub type MySqlAuthService =
    AuthService<MySqlUserRepository, MySqlTokenRepository, MySqlAuditLogRepository>;

/// Infrastructure service container
#[cfg(feature = "mysql")]
pub struct InfrastructureServices {
    /// Shared connection pool
    pub database: DatabasePool,
    /// Token authority
    pub token_service: Arc<MySqlTokenService>,
    /// Registration, login, refresh and logout
    pub auth_service: Arc<MySqlAuthService>,
    /// Background cleanup task, when enabled
    pub cleanup_task: Option<JoinHandle<()>>,
}

#[cfg(feature = "mysql")]
impl InfrastructureServices {
    /// Stops the cleanup task and closes the pool
    pub async fn shutdown(self) {
        if let Some(task) = self.cleanup_task {
            task.abort();
        }
        self.database.close().await;
    }
}

/// Initialize infrastructure services
///
/// This function sets up:
/// - The database connection pool
/// - MySQL repositories for users, refresh tokens and audit logs
/// - The token and authentication services
/// - The expired token cleanup task, if enabled
#[cfg(feature = "mysql")]
pub async fn initialize(config: &AppConfig) -> Result<InfrastructureServices, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing infrastructure services...");

    config.validate()?;
    if config.auth.jwt.is_using_default_secret() {
        tracing::warn!("Using the default JWT secret; set MV__AUTH__JWT__SECRET");
    }

    let database = DatabasePool::new(&config.database).await?;
    if !database.health_check().await? {
        return Err(InfrastructureError::General(
            "database health check failed".to_string(),
        ));
    }

    let pool = database.get_pool().clone();
    let users = Arc::new(MySqlUserRepository::new(pool.clone()));
    let tokens = Arc::new(MySqlTokenRepository::new(pool.clone()));
    let audit = Arc::new(MySqlAuditLogRepository::new(pool));

    let token_config = TokenServiceConfig::from_jwt_config(&config.auth.jwt)?;
    let token_service = Arc::new(TokenService::new(tokens.clone(), users.clone(), token_config));

    let audit_service = Arc::new(AuditService::new(audit, AuditServiceConfig::default()));
    let auth_service = Arc::new(AuthService::with_audit(
        users,
        token_service.clone(),
        audit_service,
        AuthServiceConfig::from(&config.auth.password),
    ));

    let cleanup = Arc::new(TokenCleanupService::new(
        tokens,
        TokenCleanupConfig::try_from(&config.auth.cleanup)?,
    ));
    let cleanup_task = cleanup.start_background_task();

    tracing::info!("Infrastructure services initialized successfully");

    Ok(InfrastructureServices {
        database,
        token_service,
        auth_service,
        cleanup_task,
    })
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Settings(#[from] ConfigError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A core service refused its configuration
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
