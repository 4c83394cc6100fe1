/// User model
///
/// A user is a subscription-scoped actor. An account binds at most one user
/// at a time as its "current user" (see [`crate::binding`]); the same person
/// may own users in several subscriptions, all sharing the account's email.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     username VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     subscription_id UUID REFERENCES subscriptions(id),
///     created_at TIMESTAMPTZ,
///     created_by UUID
/// );
/// ```
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::{ApiResource, AuditStamp, OwnershipPolicy};

/// Subscription-scoped actor
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Persistent identifier, None until first persistence
    pub id: Option<Uuid>,

    /// Display/login name within the subscription
    pub username: String,

    /// Email address; matches the owning account's email
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Subscription this user belongs to
    pub subscription_id: Option<Uuid>,

    /// Creation metadata, stamped by the gateway
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl User {
    /// Creates a blank, unpersisted user
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        subscription_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            subscription_id,
            audit: AuditStamp::default(),
        }
    }
}

impl ApiResource for User {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn subscription_id(&self) -> Option<Uuid> {
        self.subscription_id
    }

    fn set_identity_cleared(&mut self) {
        self.id = None;
        self.audit.clear();
    }
}

/// Users in the same subscription may see each other; a user only edits or
/// deletes itself.
impl OwnershipPolicy for User {
    fn can_create(&self, _viewer: &User) -> bool {
        true
    }

    fn can_edit(&self, viewer: &User) -> bool {
        self.id.is_some() && viewer.id == self.id
    }

    fn can_see(&self, viewer: &User) -> bool {
        self.subscription_id.is_some() && viewer.subscription_id == self.subscription_id
    }

    fn can_delete(&self, viewer: &User) -> bool {
        self.id.is_some() && viewer.id == self.id
    }
}
