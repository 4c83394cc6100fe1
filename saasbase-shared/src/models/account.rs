/// Account model
///
/// The account is the tenant-level login identity. It may bind one "current
/// user" (a subscription-scoped actor) at a time, and carries the
/// password-reset fields: the opaque confirmation token and the timestamp of
/// the last reset request.
///
/// Invariant: `confirmation_token` is non-None only while a reset is
/// pending. Applying a new password clears the token and the timestamp
/// together; there is no state where only one of them is set.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     confirmation_token VARCHAR(64),
///     confirmation_requested_at TIMESTAMPTZ,
///     current_user_id UUID REFERENCES users(id),
///     subscription_id UUID REFERENCES subscriptions(id),
///     created_at TIMESTAMPTZ,
///     created_by UUID
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::{ApiResource, AuditStamp, OwnershipPolicy};
use super::user::User;

/// Tenant-level login identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Persistent identifier, None until first persistence
    pub id: Option<Uuid>,

    /// Login email, unique across accounts
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Opaque single-use secret authorizing one password change
    ///
    /// Non-None only while a reset is pending.
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,

    /// When the pending reset was requested
    pub confirmation_requested_at: Option<DateTime<Utc>>,

    /// Currently bound active user, if one has been selected
    pub current_user_id: Option<Uuid>,

    /// Subscription the account last operated under
    pub subscription_id: Option<Uuid>,

    /// Creation metadata, stamped by the gateway
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl Account {
    /// Creates a blank, pre-validation account: no identifier, no token
    pub fn new() -> Self {
        Self {
            id: None,
            email: String::new(),
            password_hash: String::new(),
            confirmation_token: None,
            confirmation_requested_at: None,
            current_user_id: None,
            subscription_id: None,
            audit: AuditStamp::default(),
        }
    }

    /// Whether a password reset is currently pending
    pub fn has_pending_reset(&self) -> bool {
        self.confirmation_token.is_some()
    }

    /// Records a freshly issued confirmation token
    pub fn issue_confirmation(&mut self, token: String, requested_at: DateTime<Utc>) {
        self.confirmation_token = Some(token);
        self.confirmation_requested_at = Some(requested_at);
    }

    /// Applies a new password hash and consumes the pending reset
    ///
    /// Token and requested-at are cleared together; the account never ends
    /// up with only one of them set.
    pub fn apply_password(&mut self, password_hash: String) {
        self.password_hash = password_hash;
        self.confirmation_token = None;
        self.confirmation_requested_at = None;
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiResource for Account {
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

/// Only the account's own bound user may see, edit or delete it.
impl OwnershipPolicy for Account {
    fn can_create(&self, _viewer: &User) -> bool {
        // Signup happens outside an authenticated context.
        true
    }

    fn can_edit(&self, viewer: &User) -> bool {
        self.is_bound_to(viewer)
    }

    fn can_see(&self, viewer: &User) -> bool {
        self.is_bound_to(viewer)
    }

    fn can_delete(&self, viewer: &User) -> bool {
        self.is_bound_to(viewer)
    }
}

impl Account {
    fn is_bound_to(&self, viewer: &User) -> bool {
        self.current_user_id.is_some() && viewer.id == self.current_user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_blank() {
        let account = Account::new();
        assert!(account.id.is_none());
        assert!(account.confirmation_token.is_none());
        assert!(account.confirmation_requested_at.is_none());
        assert!(!account.has_pending_reset());
    }

    #[test]
    fn test_apply_password_clears_reset_state() {
        let mut account = Account::new();
        account.issue_confirmation("secret".to_string(), Utc::now());
        assert!(account.has_pending_reset());

        account.apply_password("$argon2id$new".to_string());
        assert_eq!(account.password_hash, "$argon2id$new");
        assert!(account.confirmation_token.is_none());
        assert!(account.confirmation_requested_at.is_none());
    }

    #[test]
    fn test_only_bound_user_can_edit() {
        let mut account = Account::new();
        let mut user = User::new("u", "u@example.com", "hash", Some(Uuid::new_v4()));
        user.set_id(Uuid::new_v4());

        assert!(!account.can_edit(&user));
        assert!(!account.can_see(&user));

        account.current_user_id = user.id;
        assert!(account.can_edit(&user));
        assert!(account.can_see(&user));
        assert!(account.can_delete(&user));
    }

    #[test]
    fn test_clone_as_new_preserves_reset_fields() {
        let mut account = Account::new();
        account.set_id(Uuid::new_v4());
        account.email = "a@x.com".to_string();
        account.issue_confirmation("secret".to_string(), Utc::now());
        account.audit.created_at = Some(Utc::now());
        account.audit.created_by = Some(Uuid::new_v4());

        let copy = account.clone_as_new();
        assert!(copy.id.is_none());
        assert!(copy.audit.created_at.is_none());
        assert!(copy.audit.created_by.is_none());
        assert_eq!(copy.email, "a@x.com");
        assert_eq!(copy.confirmation_token, account.confirmation_token);
    }
}
