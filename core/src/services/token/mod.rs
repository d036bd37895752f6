//! Token service module for JWT management
//!
//! This module handles all token-related operations including:
//! - Access token minting and verification
//! - Refresh token issuance and single-use rotation
//! - Reuse detection with session-wide revocation
//! - Background cleanup of expired ledger rows

mod cleanup;
mod config;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupConfig, TokenCleanupService};
pub use config::TokenServiceConfig;
pub use service::TokenService;
