//! Database layer - MySQL connection pool and repository implementations

pub mod connection;
pub mod mysql;

pub use connection::DatabasePool;
pub use mysql::{MySqlAuditLogRepository, MySqlTokenRepository, MySqlUserRepository};
