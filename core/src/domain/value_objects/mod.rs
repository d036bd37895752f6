//! Value objects exchanged with callers of the account flow.

pub mod account;

pub use account::{LoginResponse, RegistrationRequest};
