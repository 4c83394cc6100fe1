/// Resource ownership model
///
/// Every entity exposed over the API carries an [`AuditStamp`] (creation
/// metadata, written exactly once at first persistence) and implements
/// [`OwnershipPolicy`] to answer per-viewer capability queries. There is
/// deliberately no default policy implementation: a resource type that
/// forgets to define one does not compile, instead of silently permitting
/// or denying access.
///
/// Capability flags are never persisted. They are computed per request for
/// the viewing user via [`Capabilities::for_viewer`] and only exist after
/// that computation.
///
/// # Example
///
/// ```
/// use saasbase_shared::models::{ApiResource, Capabilities, Subscription, User};
/// use uuid::Uuid;
///
/// let mut subscription = Subscription::new("acme");
/// subscription.set_id(Uuid::new_v4());
/// let viewer = User::new("jane", "jane@acme.test", "$argon2id$...", subscription.id());
///
/// let caps = Capabilities::for_viewer(&subscription, &viewer);
/// assert!(caps.can_see);
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

/// Creation metadata embedded in every API resource
///
/// Both fields start unset and are stamped by the persistence gateway on
/// first write. Once set they are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditStamp {
    /// When the resource was first persisted
    pub created_at: Option<DateTime<Utc>>,

    /// The user that was authenticated when the resource was first persisted
    pub created_by: Option<Uuid>,
}

impl AuditStamp {
    /// True once both creation fields have been written
    pub fn is_stamped(&self) -> bool {
        self.created_at.is_some()
    }

    /// Clears both creation fields
    ///
    /// Used when a resource is duplicated: a copy always looks new.
    pub fn clear(&mut self) {
        self.created_at = None;
        self.created_by = None;
    }
}

/// Per-viewer capability flags, computed per request
///
/// These are derived from the resource's [`OwnershipPolicy`] for a concrete
/// viewing user. They are not stored anywhere; constructing the struct *is*
/// the computation, so they cannot be read before being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Whether the viewer may see the resource
    #[serde(rename = "userCanSee")]
    pub can_see: bool,

    /// Whether the viewer may edit the resource
    #[serde(rename = "userCanEdit")]
    pub can_edit: bool,

    /// Whether the viewer may delete the resource
    #[serde(rename = "userCanDelete")]
    pub can_delete: bool,
}

impl Capabilities {
    /// Computes the capability flags of `resource` for `viewer`
    pub fn for_viewer<R: OwnershipPolicy>(resource: &R, viewer: &User) -> Self {
        Self {
            can_see: resource.can_see(viewer),
            can_edit: resource.can_edit(viewer),
            can_delete: resource.can_delete(viewer),
        }
    }
}

/// Capability contract every concrete resource type must implement
///
/// Each resource defines its own policy (for example "creator or same
/// subscription"). The four queries are independent and side-effect free.
pub trait OwnershipPolicy {
    /// Whether `viewer` may create resources of this type
    fn can_create(&self, viewer: &User) -> bool;

    /// Whether `viewer` may edit this resource
    fn can_edit(&self, viewer: &User) -> bool;

    /// Whether `viewer` may see this resource
    fn can_see(&self, viewer: &User) -> bool;

    /// Whether `viewer` may delete this resource
    fn can_delete(&self, viewer: &User) -> bool;
}

/// Contract shared by every entity exposed over the API
///
/// Gives the persistence gateway uniform access to identity, audit metadata
/// and the owning subscription.
pub trait ApiResource {
    /// Persistent identifier, None until first persistence
    fn id(&self) -> Option<Uuid>;

    /// Assigns the persistent identifier (first persistence only)
    fn set_id(&mut self, id: Uuid);

    /// Audit metadata
    fn audit(&self) -> &AuditStamp;

    /// Mutable audit metadata (used by the gateway for stamping)
    fn audit_mut(&mut self) -> &mut AuditStamp;

    /// Owning subscription, if any
    fn subscription_id(&self) -> Option<Uuid>;

    /// Duplicates the resource as a brand-new one
    ///
    /// Identifier and audit metadata are stripped; every other field is
    /// preserved.
    fn clone_as_new(&self) -> Self
    where
        Self: Clone + Sized,
    {
        let mut copy = self.clone();
        copy.set_identity_cleared();
        copy
    }

    /// Clears identifier and audit metadata in place
    fn set_identity_cleared(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subscription;

    fn viewer(subscription_id: Option<Uuid>) -> User {
        User::new("viewer", "viewer@example.com", "hash", subscription_id)
    }

    #[test]
    fn test_audit_stamp_starts_unset() {
        let stamp = AuditStamp::default();
        assert!(!stamp.is_stamped());
        assert!(stamp.created_at.is_none());
        assert!(stamp.created_by.is_none());
    }

    #[test]
    fn test_audit_stamp_clear() {
        let mut stamp = AuditStamp {
            created_at: Some(Utc::now()),
            created_by: Some(Uuid::new_v4()),
        };
        assert!(stamp.is_stamped());

        stamp.clear();
        assert!(!stamp.is_stamped());
        assert!(stamp.created_by.is_none());
    }

    #[test]
    fn test_capabilities_computed_for_member() {
        let mut subscription = Subscription::new("acme");
        subscription.set_id(Uuid::new_v4());
        let member = viewer(subscription.id());

        let caps = Capabilities::for_viewer(&subscription, &member);
        assert!(caps.can_see);
        assert!(caps.can_edit);
        assert!(!caps.can_delete);
    }

    #[test]
    fn test_capabilities_computed_for_outsider() {
        let mut subscription = Subscription::new("acme");
        subscription.set_id(Uuid::new_v4());
        let outsider = viewer(Some(Uuid::new_v4()));

        let caps = Capabilities::for_viewer(&subscription, &outsider);
        assert!(!caps.can_see);
        assert!(!caps.can_edit);
        assert!(!caps.can_delete);
    }

    #[test]
    fn test_clone_as_new_strips_identity() {
        let mut subscription = Subscription::new("acme");
        subscription.set_id(Uuid::new_v4());
        subscription.audit_mut().created_at = Some(Utc::now());
        subscription.audit_mut().created_by = Some(Uuid::new_v4());

        let copy = subscription.clone_as_new();
        assert!(copy.id().is_none());
        assert!(copy.audit().created_at.is_none());
        assert!(copy.audit().created_by.is_none());
        assert_eq!(copy.name, subscription.name);
    }
}
