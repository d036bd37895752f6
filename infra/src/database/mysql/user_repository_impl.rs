//! MySQL implementation of the UserRepository trait.
//!
//! Users live in `users`; their roles in `user_roles`, ordered by the
//! position they were granted in. Usernames are compared through the
//! lower-cased `normalized_username` column, which carries the unique index.

use async_trait::async_trait;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use mv_core::domain::entities::user::User;
use mv_core::errors::DomainError;
use mv_core::repositories::UserRepository;

use super::{db_error, parse_uuid};

/// MySQL implementation of UserRepository
#[derive(Clone)]
pub struct MySqlUserRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlUserRepository {
    /// Create a new MySQL user repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn normalize(username: &str) -> String {
        username.trim().to_lowercase()
    }

    /// Convert database row to User entity, without roles
    fn row_to_user(row: &sqlx::mysql::MySqlRow) -> Result<User, DomainError> {
        let id: String = row.try_get("id").map_err(db_error("get id"))?;

        Ok(User {
            id: parse_uuid(&id, "user id")?,
            username: row.try_get("username").map_err(db_error("get username"))?,
            name: row.try_get("name").map_err(db_error("get name"))?,
            password_hash: row
                .try_get("password_hash")
                .map_err(db_error("get password_hash"))?,
            roles: Vec::new(),
            created_at: row.try_get("created_at").map_err(db_error("get created_at"))?,
            updated_at: row.try_get("updated_at").map_err(db_error("get updated_at"))?,
        })
    }

    async fn load_roles(&self, mut user: User) -> Result<User, DomainError> {
        let rows = sqlx::query("SELECT role FROM user_roles WHERE user_id = ? ORDER BY position ASC")
            .bind(user.id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("load user roles"))?;

        user.roles = rows
            .iter()
            .map(|row| row.try_get::<String, _>("role"))
            .collect::<Result<_, _>>()
            .map_err(db_error("get role"))?;

        Ok(user)
    }

    async fn find_one(&self, column: &str, value: String) -> Result<Option<User>, DomainError> {
        let query = format!(
            "SELECT id, username, name, password_hash, created_at, updated_at \
             FROM users WHERE {} = ? LIMIT 1",
            column
        );

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find user"))?;

        match row {
            Some(row) => Ok(Some(self.load_roles(Self::row_to_user(&row)?).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.find_one("normalized_username", Self::normalize(username)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        self.find_one("id", id.to_string()).await
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, DomainError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM users WHERE normalized_username = ?) AS taken",
        )
        .bind(Self::normalize(username))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check username"))?;

        let taken: i64 = row.try_get("taken").map_err(db_error("get taken"))?;
        Ok(taken == 1)
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, normalized_username, name, password_hash, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(Self::normalize(&user.username))
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DomainError::Validation {
                message: "Username already registered".to_string(),
            },
            other => db_error("create user")(other),
        })?;

        for (position, role) in user.roles.iter().enumerate() {
            sqlx::query("INSERT INTO user_roles (user_id, role, position) VALUES (?, ?, ?)")
                .bind(user.id.to_string())
                .bind(role)
                .bind(position as u32)
                .execute(&mut *tx)
                .await
                .map_err(db_error("grant role"))?;
        }

        tx.commit().await.map_err(db_error("commit user"))?;

        Ok(user)
    }
}
