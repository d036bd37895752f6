//! Audit service module for recording authentication and token events.

mod service;

pub use service::{AuditService, AuditServiceConfig};
