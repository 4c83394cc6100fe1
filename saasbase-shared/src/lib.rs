//! # Saasbase Shared Library
//!
//! This crate contains the domain models and business logic shared across
//! the Saasbase API server: the account lifecycle, the password-reset state
//! machine and the ownership/authorization model.
//!
//! ## Module Organization
//!
//! - `models`: Accounts, users, subscriptions and the resource ownership model
//! - `store`: Persistence gateway and storage backends
//! - `manager`: Account-specific lookups and mutations
//! - `reset`: Password-reset state machine
//! - `binding`: Account/subscription active-user binding
//! - `auth`: Context resolution, JWT, password hashing, token generation
//! - `events`: Fire-and-forget domain event bus

pub mod auth;
pub mod binding;
pub mod events;
pub mod manager;
pub mod models;
pub mod reset;
pub mod store;

/// Current version of the saasbase shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
