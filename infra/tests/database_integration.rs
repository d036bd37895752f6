//! MySQL integration tests
//!
//! These need a disposable database: `DATABASE_URL=mysql://... cargo test -- --ignored`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use mv_core::domain::entities::audit::{AuditEventType, AuditLog};
use mv_core::domain::entities::token::{InvalidationReason, RefreshToken};
use mv_core::domain::entities::user::User;
use mv_core::errors::{DomainError, TokenError};
use mv_core::repositories::{AuditLogRepository, TokenRepository, UserRepository};
use mv_core::services::{TokenService, TokenServiceConfig};
use mv_infra::database::{
    DatabasePool, MySqlAuditLogRepository, MySqlTokenRepository, MySqlUserRepository,
};
use mv_shared::DatabaseConfig;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id CHAR(36) NOT NULL PRIMARY KEY,
        username VARCHAR(255) NOT NULL,
        normalized_username VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        created_at DATETIME(6) NOT NULL,
        updated_at DATETIME(6) NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_roles (
        user_id CHAR(36) NOT NULL,
        role VARCHAR(64) NOT NULL,
        position INT UNSIGNED NOT NULL,
        PRIMARY KEY (user_id, role)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS refresh_tokens (
        id CHAR(36) NOT NULL PRIMARY KEY,
        user_id CHAR(36) NOT NULL,
        session_id CHAR(36) NOT NULL,
        token_hash CHAR(64) NOT NULL UNIQUE,
        created_at DATETIME(6) NOT NULL,
        expires_at DATETIME(6) NOT NULL,
        is_valid BOOLEAN NOT NULL,
        invalidated_at DATETIME(6) NULL,
        invalidation_reason VARCHAR(32) NULL,
        family_revoked_at DATETIME(6) NULL,
        INDEX idx_refresh_tokens_session (session_id),
        INDEX idx_refresh_tokens_user (user_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS auth_audit_logs (
        id CHAR(36) NOT NULL PRIMARY KEY,
        event_type VARCHAR(64) NOT NULL,
        user_id CHAR(36) NULL,
        session_id CHAR(36) NULL,
        username VARCHAR(255) NULL,
        success BOOLEAN NOT NULL,
        failure_reason VARCHAR(255) NULL,
        metadata TEXT NULL,
        created_at DATETIME(6) NOT NULL,
        INDEX idx_audit_user (user_id),
        INDEX idx_audit_session (session_id)
    )"#,
];

async fn pool() -> DatabasePool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = DatabasePool::new(&DatabaseConfig::new(url).with_max_connections(5))
        .await
        .expect("database reachable");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool.get_pool())
            .await
            .expect("schema created");
    }
    pool
}

fn unique_username() -> String {
    format!("user_{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let pool = pool().await;
    assert!(pool.health_check().await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_user_round_trip_with_roles() {
    let pool = pool().await;
    let repo = MySqlUserRepository::new(pool.get_pool().clone());

    let username = unique_username();
    let mut user = User::new(
        username.clone(),
        "Integration".to_string(),
        "$2b$04$hash".to_string(),
        "admin".to_string(),
    );
    user.add_role("customer");
    repo.create(user.clone()).await.unwrap();

    let found = repo
        .find_by_username(&username.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.roles, vec!["admin".to_string(), "customer".to_string()]);
    assert!(repo.exists_by_username(&username).await.unwrap());

    let duplicate = User::new(
        username.to_uppercase(),
        "Dup".to_string(),
        "x".to_string(),
        "admin".to_string(),
    );
    assert!(repo.create(duplicate).await.is_err());
}

#[tokio::test]
#[ignore]
async fn test_token_ledger_compare_and_set() {
    let pool = pool().await;
    let repo = MySqlTokenRepository::new(pool.get_pool().clone());

    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let first = RefreshToken::new(
        user_id,
        session_id,
        format!("{:0>64}", Uuid::new_v4().simple()),
        Duration::minutes(3),
    );
    let second = RefreshToken::new(
        user_id,
        session_id,
        format!("{:0>64}", Uuid::new_v4().simple()),
        Duration::minutes(3),
    );
    repo.save_refresh_token(first.clone()).await.unwrap();
    repo.save_refresh_token(second.clone()).await.unwrap();

    assert!(repo
        .invalidate_token(&first.token_hash, InvalidationReason::Consumed)
        .await
        .unwrap());
    assert!(!repo
        .invalidate_token(&first.token_hash, InvalidationReason::Consumed)
        .await
        .unwrap());

    let revoked = repo
        .invalidate_session(session_id, InvalidationReason::FamilyRevoked)
        .await
        .unwrap();
    assert_eq!(revoked, 1);

    let family = repo.find_by_session(session_id).await.unwrap();
    assert_eq!(family.len(), 2);
    assert!(family.iter().all(|t| !t.is_valid && t.is_family_revoked()));
    assert_eq!(
        family[0].invalidation_reason,
        Some(InvalidationReason::Consumed)
    );
}

#[tokio::test]
#[ignore]
async fn test_revoke_all_stamps_every_session_of_principal() {
    let pool = pool().await;
    let repo = MySqlTokenRepository::new(pool.get_pool().clone());

    let user_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    let used = RefreshToken::new(
        user_id,
        session_id,
        format!("{:0>64}", Uuid::new_v4().simple()),
        Duration::minutes(3),
    );
    let live = RefreshToken::new(
        user_id,
        Uuid::new_v4(),
        format!("{:0>64}", Uuid::new_v4().simple()),
        Duration::minutes(3),
    );
    repo.save_refresh_token(used.clone()).await.unwrap();
    repo.save_refresh_token(live.clone()).await.unwrap();
    repo.invalidate_token(&used.token_hash, InvalidationReason::Consumed)
        .await
        .unwrap();

    let revoked = repo
        .revoke_all_user_tokens(user_id, InvalidationReason::LoggedOut)
        .await
        .unwrap();
    assert_eq!(revoked, 1);

    for hash in [&used.token_hash, &live.token_hash] {
        let row = repo.find_refresh_token(hash).await.unwrap().unwrap();
        assert!(!row.is_valid);
        assert!(row.is_family_revoked());
    }
}

#[tokio::test]
#[ignore]
async fn test_rotation_and_reuse_against_mysql() {
    let pool = pool().await;
    let users = Arc::new(MySqlUserRepository::new(pool.get_pool().clone()));
    let tokens = Arc::new(MySqlTokenRepository::new(pool.get_pool().clone()));

    let user = users
        .create(User::new(
            unique_username(),
            "Rotation".to_string(),
            "$2b$04$hash".to_string(),
            "customer".to_string(),
        ))
        .await
        .unwrap();

    let service = TokenService::new(tokens.clone(), users, TokenServiceConfig::default());
    let first = service.issue(&user.principal()).await.unwrap();
    let second = service
        .rotate(&first.access_token, &first.refresh_token)
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);

    let replay = service.rotate(&first.access_token, &first.refresh_token).await;
    assert!(matches!(
        replay,
        Err(DomainError::Token(TokenError::ReuseDetected))
    ));
    assert!(service
        .rotate(&second.access_token, &second.refresh_token)
        .await
        .is_err());
    assert_eq!(tokens.count_active_in_session(first.session_id).await.unwrap(), 0);

    let deleted = tokens
        .delete_expired_tokens(Utc::now() - Duration::days(3650))
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
#[ignore]
async fn test_audit_log_round_trip() {
    let pool = pool().await;
    let repo = MySqlAuditLogRepository::new(pool.get_pool().clone());

    let session_id = Uuid::new_v4();
    let log = AuditLog::new(AuditEventType::RefreshTokenReuse, false)
        .with_session(session_id)
        .with_failure("reuse_detected")
        .with_metadata(serde_json::json!({ "client_code": "invalid_token" }));
    repo.create(&log).await.unwrap();

    let trail = repo.find_by_session(session_id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].event_type, AuditEventType::RefreshTokenReuse);
    assert_eq!(trail[0].metadata, log.metadata);
}
