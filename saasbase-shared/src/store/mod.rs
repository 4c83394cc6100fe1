/// Entity persistence gateway
///
/// All mutations go through the [`Gateway`], which stamps audit metadata
/// before delegating to a storage backend. The backend contract is
/// [`AccountStore`]: lookups plus a stage/commit write interface, so callers
/// can batch several staged writes into a single durability point.
///
/// Two backends ship with the crate:
///
/// - [`postgres::PgStore`]: sqlx/PostgreSQL, staged writes applied in one
///   transaction per commit
/// - [`memory::MemoryStore`]: in-process maps, used by tests and the
///   `memory` storage backend configuration
///
/// # Stamping rules
///
/// On every `update`:
///
/// 1. an identifier is assigned if the entity has none;
/// 2. `created_at` is stamped with the current wall-clock time if unset;
/// 3. `created_by` is stamped from the acting user if unset and an acting
///    user is present.
///
/// Stamping is idempotent: a second `update` never overwrites any of the
/// three, whatever the ambient acting user is by then.
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Account, ApiResource, Subscription, User};

/// Error type for storage operations
///
/// Storage failures are fatal for the request: they propagate to the
/// transport layer and are never retried inside the core.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend-specific failure (bad staging state, closed store, ...)
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// A write waiting for the next commit
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Account(Account),
    AccountRemoval(Uuid),
    User(User),
    UserRemoval(Uuid),
    Subscription(Subscription),
    SubscriptionRemoval(Uuid),
}

/// Persistence collaborator contract
///
/// Lookup misses are `Ok(None)`, never errors. `stage_*` buffers a write;
/// `commit` applies everything staged so far atomically.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn account_by_confirmation_token(&self, token: &str)
        -> Result<Option<Account>, StoreError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Finds the user belonging to `subscription_id` that is reachable from
    /// an account with the given email
    async fn user_in_subscription(
        &self,
        subscription_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn subscription_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError>;

    async fn stage_account(&self, account: &Account) -> Result<(), StoreError>;
    async fn stage_account_removal(&self, id: Uuid) -> Result<(), StoreError>;
    async fn stage_user(&self, user: &User) -> Result<(), StoreError>;
    async fn stage_user_removal(&self, id: Uuid) -> Result<(), StoreError>;
    async fn stage_subscription(&self, subscription: &Subscription) -> Result<(), StoreError>;
    async fn stage_subscription_removal(&self, id: Uuid) -> Result<(), StoreError>;

    /// Applies all staged writes as one durability point
    async fn commit(&self) -> Result<(), StoreError>;
}

/// Ties an [`ApiResource`] to the store method that persists it
#[async_trait]
pub trait Persist: ApiResource + Send + Sync {
    async fn stage(&self, store: &dyn AccountStore) -> Result<(), StoreError>;
    async fn stage_removal(&self, store: &dyn AccountStore) -> Result<(), StoreError>;
}

#[async_trait]
impl Persist for Account {
    async fn stage(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        store.stage_account(self).await
    }

    async fn stage_removal(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        match self.id {
            Some(id) => store.stage_account_removal(id).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Persist for User {
    async fn stage(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        store.stage_user(self).await
    }

    async fn stage_removal(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        match self.id {
            Some(id) => store.stage_user_removal(id).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Persist for Subscription {
    async fn stage(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        store.stage_subscription(self).await
    }

    async fn stage_removal(&self, store: &dyn AccountStore) -> Result<(), StoreError> {
        match self.id {
            Some(id) => store.stage_subscription_removal(id).await,
            None => Ok(()),
        }
    }
}

/// Audit-stamping write gateway over an [`AccountStore`]
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn AccountStore>,
}

impl Gateway {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// The underlying storage backend
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Saves the entity, stamping identity and audit metadata exactly once
    ///
    /// With `flush = false` the write is only staged; the caller batches
    /// further changes and commits them in one transaction via a final
    /// flushing call or [`Gateway::flush`].
    pub async fn update<T: Persist>(
        &self,
        entity: &mut T,
        acting_user: Option<&User>,
        flush: bool,
    ) -> Result<(), StoreError> {
        if entity.id().is_none() {
            entity.set_id(Uuid::new_v4());
        }

        let audit = entity.audit_mut();
        if audit.created_at.is_none() {
            audit.created_at = Some(Utc::now());
        }
        if audit.created_by.is_none() {
            if let Some(user) = acting_user {
                audit.created_by = user.id;
            }
        }

        entity.stage(self.store.as_ref()).await?;
        if flush {
            self.store.commit().await?;
        }
        Ok(())
    }

    /// Stages the entity for deletion; commits immediately when `flush`
    pub async fn remove<T: Persist>(&self, entity: &T, flush: bool) -> Result<(), StoreError> {
        entity.stage_removal(self.store.as_ref()).await?;
        if flush {
            self.store.commit().await?;
        }
        Ok(())
    }

    /// Commits everything staged so far
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.store.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::models::Subscription;

    fn gateway() -> Gateway {
        Gateway::new(Arc::new(MemoryStore::new()))
    }

    fn acting_user(id: Uuid) -> User {
        let mut user = User::new("actor", "actor@example.com", "hash", None);
        user.set_id(id);
        user
    }

    #[tokio::test]
    async fn test_update_stamps_fresh_entity_once() {
        let gateway = gateway();
        let actor = acting_user(Uuid::new_v4());

        let mut subscription = Subscription::new("acme");
        gateway
            .update(&mut subscription, Some(&actor), true)
            .await
            .unwrap();

        assert!(subscription.id.is_some());
        assert!(subscription.audit.created_at.is_some());
        assert_eq!(subscription.audit.created_by, actor.id);
    }

    #[tokio::test]
    async fn test_update_never_restamps() {
        let gateway = gateway();
        let first_actor = acting_user(Uuid::new_v4());

        let mut subscription = Subscription::new("acme");
        gateway
            .update(&mut subscription, Some(&first_actor), true)
            .await
            .unwrap();

        let stamped_id = subscription.id;
        let stamped_at = subscription.audit.created_at;

        // A later update under a different ambient user changes nothing.
        let second_actor = acting_user(Uuid::new_v4());
        subscription.name = "acme renamed".to_string();
        gateway
            .update(&mut subscription, Some(&second_actor), true)
            .await
            .unwrap();

        assert_eq!(subscription.id, stamped_id);
        assert_eq!(subscription.audit.created_at, stamped_at);
        assert_eq!(subscription.audit.created_by, first_actor.id);
    }

    #[tokio::test]
    async fn test_update_without_acting_user_leaves_creator_unset() {
        let gateway = gateway();

        let mut subscription = Subscription::new("acme");
        gateway.update(&mut subscription, None, true).await.unwrap();

        assert!(subscription.audit.created_at.is_some());
        assert!(subscription.audit.created_by.is_none());
    }

    #[tokio::test]
    async fn test_deferred_flush_batches_writes() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Gateway::new(store.clone());

        let mut a = Subscription::new("a");
        let mut b = Subscription::new("b");
        gateway.update(&mut a, None, false).await.unwrap();
        gateway.update(&mut b, None, false).await.unwrap();

        // Nothing visible before the commit.
        assert!(store
            .subscription_by_id(a.id.unwrap())
            .await
            .unwrap()
            .is_none());

        gateway.flush().await.unwrap();
        assert!(store
            .subscription_by_id(a.id.unwrap())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .subscription_by_id(b.id.unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_remove_deletes_entity() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Gateway::new(store.clone());

        let mut subscription = Subscription::new("acme");
        gateway.update(&mut subscription, None, true).await.unwrap();

        gateway.remove(&subscription, true).await.unwrap();
        assert!(store
            .subscription_by_id(subscription.id.unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
