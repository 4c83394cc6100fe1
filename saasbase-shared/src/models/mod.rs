/// Domain models for Saasbase
///
/// This module contains all domain entities and the ownership model shared
/// by every API resource.
///
/// # Models
///
/// - `resource`: Audit stamp, per-viewer capabilities and ownership policies
/// - `account`: Tenant-level login identity with the password-reset fields
/// - `user`: Subscription-scoped actor, bindable to one account at a time
/// - `subscription`: Plan/grouping that owns users
pub mod account;
pub mod resource;
pub mod subscription;
pub mod user;

pub use account::Account;
pub use resource::{ApiResource, AuditStamp, Capabilities, OwnershipPolicy};
pub use subscription::Subscription;
pub use user::User;
