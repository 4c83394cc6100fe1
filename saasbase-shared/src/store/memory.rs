/// In-memory storage backend
///
/// Backs the `memory` storage configuration and the test suites. Writes are
/// staged in a buffer and applied under a single write lock on commit, so a
/// commit is atomic with respect to readers.
///
/// The store counts confirmation-token lookups so tests can assert that
/// certain code paths never touch storage.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Account, Subscription, User};

use super::{AccountStore, StagedWrite, StoreError};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    users: HashMap<Uuid, User>,
    subscriptions: HashMap<Uuid, Subscription>,
}

/// Map-backed [`AccountStore`] implementation
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    staged: Mutex<Vec<StagedWrite>>,
    token_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many confirmation-token lookups have hit this store
    pub fn confirmation_token_lookups(&self) -> usize {
        self.token_lookups.load(Ordering::SeqCst)
    }

    fn lock_tables(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("memory store lock poisoned")
    }

    fn stage(&self, write: StagedWrite) {
        self.staged
            .lock()
            .expect("memory store lock poisoned")
            .push(write);
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.lock_tables().accounts.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock_tables()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn account_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock_tables()
            .accounts
            .values()
            .find(|a| a.confirmation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock_tables().users.get(&id).cloned())
    }

    async fn user_in_subscription(
        &self,
        subscription_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock_tables()
            .users
            .values()
            .find(|u| u.subscription_id == Some(subscription_id) && u.email == email)
            .cloned())
    }

    async fn subscription_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError> {
        Ok(self.lock_tables().subscriptions.get(&id).cloned())
    }

    async fn stage_account(&self, account: &Account) -> Result<(), StoreError> {
        if account.id.is_none() {
            return Err(StoreError::Backend(
                "cannot stage an account without an identifier".to_string(),
            ));
        }
        self.stage(StagedWrite::Account(account.clone()));
        Ok(())
    }

    async fn stage_account_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.stage(StagedWrite::AccountRemoval(id));
        Ok(())
    }

    async fn stage_user(&self, user: &User) -> Result<(), StoreError> {
        if user.id.is_none() {
            return Err(StoreError::Backend(
                "cannot stage a user without an identifier".to_string(),
            ));
        }
        self.stage(StagedWrite::User(user.clone()));
        Ok(())
    }

    async fn stage_user_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.stage(StagedWrite::UserRemoval(id));
        Ok(())
    }

    async fn stage_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        if subscription.id.is_none() {
            return Err(StoreError::Backend(
                "cannot stage a subscription without an identifier".to_string(),
            ));
        }
        self.stage(StagedWrite::Subscription(subscription.clone()));
        Ok(())
    }

    async fn stage_subscription_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.stage(StagedWrite::SubscriptionRemoval(id));
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let writes: Vec<StagedWrite> = {
            let mut staged = self.staged.lock().expect("memory store lock poisoned");
            staged.drain(..).collect()
        };

        let mut tables = self.tables.write().expect("memory store lock poisoned");
        for write in writes {
            match write {
                StagedWrite::Account(account) => {
                    // Id presence is enforced at stage time.
                    if let Some(id) = account.id {
                        tables.accounts.insert(id, account);
                    }
                }
                StagedWrite::AccountRemoval(id) => {
                    tables.accounts.remove(&id);
                }
                StagedWrite::User(user) => {
                    if let Some(id) = user.id {
                        tables.users.insert(id, user);
                    }
                }
                StagedWrite::UserRemoval(id) => {
                    tables.users.remove(&id);
                }
                StagedWrite::Subscription(subscription) => {
                    if let Some(id) = subscription.id {
                        tables.subscriptions.insert(id, subscription);
                    }
                }
                StagedWrite::SubscriptionRemoval(id) => {
                    tables.subscriptions.remove(&id);
                }
            }
        }

        Ok(())
    }
}
