/// Authentication context resolution
///
/// Every core operation takes an explicit, possibly absent [`Principal`]
/// (the claims decoded from the request's bearer token) instead of reading
/// ambient global state. The [`ContextResolver`] turns that principal into
/// the current account, the account's bound current user, and that user's
/// subscription.
///
/// The chain short-circuits at the first absence: no principal means no
/// account, an account without a bound user means no user, and so on. "No
/// session" is a `None`, never an error, and no query has side effects.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Account, Subscription, User};
use crate::store::{AccountStore, StoreError};

/// The authenticated subject of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account the bearer token was issued for
    pub account_id: Uuid,
}

/// Resolves account/user/subscription from an explicit principal
#[derive(Clone)]
pub struct ContextResolver {
    store: Arc<dyn AccountStore>,
}

impl ContextResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// The account the principal authenticates, if it still exists
    pub async fn current_account(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Option<Account>, StoreError> {
        match principal {
            Some(principal) => self.store.account_by_id(principal.account_id).await,
            None => Ok(None),
        }
    }

    /// The account's bound current user
    ///
    /// None when there is no account, when the account has no user selected,
    /// or when the selected user no longer exists.
    pub async fn current_user(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Option<User>, StoreError> {
        let Some(account) = self.current_account(principal).await? else {
            return Ok(None);
        };
        let Some(user_id) = account.current_user_id else {
            return Ok(None);
        };
        self.store.user_by_id(user_id).await
    }

    /// The current user's subscription
    pub async fn current_subscription(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Option<Subscription>, StoreError> {
        let Some(user) = self.current_user(principal).await? else {
            return Ok(None);
        };
        let Some(subscription_id) = user.subscription_id else {
            return Ok(None);
        };
        self.store.subscription_by_id(subscription_id).await
    }
}
