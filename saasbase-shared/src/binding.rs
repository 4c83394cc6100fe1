/// Account/subscription binding
///
/// Assigns the account's active user from a subscription identifier. This
/// is the only mutation path for "current user": the user must belong to
/// the requested subscription *and* be reachable from the account (same
/// email), enforced at lookup time rather than checked after the fact.
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::context::{ContextResolver, Principal};
use crate::events::{DomainEvent, EventBus};
use crate::manager::AccountManager;
use crate::models::Account;
use crate::store::StoreError;

/// Error type for binding operations
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// No current account resolvable from the request
    #[error("no authenticated account")]
    Unauthenticated,

    /// The subscription/user pair is not a legitimate binding
    #[error("no user for this subscription reachable from the account")]
    InvalidBinding,

    /// Storage failure, fatal for the request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Binds the active user of the current account
#[derive(Clone)]
pub struct SubscriptionBinding {
    manager: AccountManager,
    resolver: ContextResolver,
    events: Arc<dyn EventBus>,
}

impl SubscriptionBinding {
    pub fn new(manager: AccountManager, events: Arc<dyn EventBus>) -> Self {
        let resolver = ContextResolver::new(manager.store().clone());
        Self {
            manager,
            resolver,
            events,
        }
    }

    /// Sets the current account's active user to the one owned by
    /// `subscription_id`
    ///
    /// Idempotently settable: re-binding the same pair succeeds and leaves
    /// the account unchanged.
    pub async fn bind_active_user(
        &self,
        principal: Option<&Principal>,
        subscription_id: Uuid,
    ) -> Result<Account, BindError> {
        let mut account = self
            .resolver
            .current_account(principal)
            .await?
            .ok_or(BindError::Unauthenticated)?;

        let user = self
            .manager
            .store()
            .user_in_subscription(subscription_id, &account.email)
            .await?
            .ok_or(BindError::InvalidBinding)?;

        let acting = self.resolver.current_user(principal).await?;

        account.current_user_id = user.id;
        account.subscription_id = user.subscription_id;
        self.manager
            .update(&mut account, acting.as_ref(), true)
            .await?;

        if let (Some(account_id), Some(user_id)) = (account.id, user.id) {
            self.events.publish(DomainEvent::ActiveUserChanged {
                account_id,
                user_id,
            });
        }

        Ok(account)
    }
}
