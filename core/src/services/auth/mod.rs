//! Authentication service module
//!
//! Registration and login against the credential store, and the account-facing
//! side of the token lifecycle (refresh and logout).

mod config;
mod password;
mod service;


pub use config::AuthServiceConfig;
pub use password::{hash_password, verify_password};
pub use service::AuthService;
