/// Account manager
///
/// Account-specific lookups plus creation; writes delegate to the
/// audit-stamping [`Gateway`]. Lookup misses are `Ok(None)`, never errors —
/// callers check for absence before proceeding.
use std::sync::Arc;

use crate::models::{Account, User};
use crate::store::{AccountStore, Gateway, StoreError};

/// Lookups and mutations for [`Account`] entities
#[derive(Clone)]
pub struct AccountManager {
    gateway: Gateway,
}

impl AccountManager {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            gateway: Gateway::new(store),
        }
    }

    /// The storage backend shared with the rest of the core
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        self.gateway.store()
    }

    /// Produces a new, unpersisted account in a blank pre-validation state
    pub fn create(&self) -> Account {
        Account::new()
    }

    /// Exact-match lookup by email
    pub async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.store().account_by_email(email).await
    }

    /// Exact-match lookup by the opaque confirmation secret
    ///
    /// An empty or whitespace-only token is "not found" and performs no
    /// storage lookup — it must never match everything.
    pub async fn account_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        self.store().account_by_confirmation_token(token).await
    }

    /// Saves the account through the gateway (audit-stamping included)
    pub async fn update(
        &self,
        account: &mut Account,
        acting_user: Option<&User>,
        flush: bool,
    ) -> Result<(), StoreError> {
        self.gateway.update(account, acting_user, flush).await
    }

    /// Removes the account through the gateway
    pub async fn remove(&self, account: &Account, flush: bool) -> Result<(), StoreError> {
        self.gateway.remove(account, flush).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn manager_with_store() -> (AccountManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AccountManager::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_is_blank() {
        let (manager, _) = manager_with_store();
        let account = manager.create();

        assert!(account.id.is_none());
        assert!(account.confirmation_token.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_email() {
        let (manager, _) = manager_with_store();

        let mut account = manager.create();
        account.email = "a@x.com".to_string();
        manager.update(&mut account, None, true).await.unwrap();

        assert!(manager.account_by_email("a@x.com").await.unwrap().is_some());
        assert!(manager
            .account_by_email("missing@x.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_empty_token_is_not_found_without_lookup() {
        let (manager, store) = manager_with_store();

        assert!(manager
            .account_by_confirmation_token("")
            .await
            .unwrap()
            .is_none());
        assert!(manager
            .account_by_confirmation_token("   ")
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.confirmation_token_lookups(), 0);
    }

    #[tokio::test]
    async fn test_token_lookup_matches_exactly() {
        let (manager, _) = manager_with_store();

        let mut account = manager.create();
        account.email = "a@x.com".to_string();
        account.issue_confirmation("secret-token".to_string(), chrono::Utc::now());
        manager.update(&mut account, None, true).await.unwrap();

        assert!(manager
            .account_by_confirmation_token("secret-token")
            .await
            .unwrap()
            .is_some());
        assert!(manager
            .account_by_confirmation_token("other-token")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_deletes_account() {
        let (manager, _) = manager_with_store();

        let mut account = manager.create();
        account.email = "a@x.com".to_string();
        manager.update(&mut account, None, true).await.unwrap();

        manager.remove(&account, true).await.unwrap();
        assert!(manager.account_by_email("a@x.com").await.unwrap().is_none());
    }
}
