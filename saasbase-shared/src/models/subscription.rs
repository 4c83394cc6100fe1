/// Subscription model
///
/// A subscription is the plan/grouping a tenant signs up for. It owns zero
/// or more users; accounts reference it through their bound user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscriptions (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ,
///     created_by UUID
/// );
/// ```
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::{ApiResource, AuditStamp, OwnershipPolicy};
use super::user::User;

/// Plan/grouping that owns users
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Persistent identifier, None until first persistence
    pub id: Option<Uuid>,

    /// Display name of the subscription
    pub name: String,

    /// Creation metadata, stamped by the gateway
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl Subscription {
    /// Creates a blank, unpersisted subscription
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            audit: AuditStamp::default(),
        }
    }
}

impl ApiResource for Subscription {
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
        self.id
    }

    fn set_identity_cleared(&mut self) {
        self.id = None;
        self.audit.clear();
    }
}

/// Members of the subscription may see and edit it; nobody deletes a
/// subscription through this surface.
impl OwnershipPolicy for Subscription {
    fn can_create(&self, _viewer: &User) -> bool {
        true
    }

    fn can_edit(&self, viewer: &User) -> bool {
        self.is_member(viewer)
    }

    fn can_see(&self, viewer: &User) -> bool {
        self.is_member(viewer)
    }

    fn can_delete(&self, _viewer: &User) -> bool {
        false
    }
}

impl Subscription {
    fn is_member(&self, viewer: &User) -> bool {
        self.id.is_some() && viewer.subscription_id == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscription_is_unpersisted() {
        let subscription = Subscription::new("acme");
        assert!(subscription.id.is_none());
        assert!(!subscription.audit.is_stamped());
    }

    #[test]
    fn test_membership_requires_persisted_id() {
        let subscription = Subscription::new("acme");
        let user = User::new("u", "u@example.com", "hash", None);

        // Neither side has an id yet; never treat that as a match.
        assert!(!subscription.can_see(&user));
        assert!(!subscription.can_edit(&user));
    }
}
