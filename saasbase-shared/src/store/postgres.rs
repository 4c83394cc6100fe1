/// PostgreSQL storage backend
///
/// sqlx-based [`AccountStore`] implementation. Staged writes are buffered in
/// memory and applied inside a single transaction on commit, so a flush is
/// one durability point however many entities were staged.
///
/// Concurrent requests race on row state; the database's transaction
/// isolation is the correctness mechanism, not in-process locking.
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Account, Subscription, User};

use super::{AccountStore, StagedWrite, StoreError};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, confirmation_token, \
     confirmation_requested_at, current_user_id, subscription_id, created_at, created_by";

const USER_COLUMNS: &str = "id, username, email, password_hash, subscription_id, created_at, created_by";

/// sqlx-backed [`AccountStore`]
pub struct PgStore {
    pool: PgPool,
    staged: Mutex<Vec<StagedWrite>>,
}

impl PgStore {
    /// Connects to PostgreSQL, runs pending migrations, and returns a
    /// store over the fresh pool
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await?;

        debug!(max_connections, "connected to postgres");

        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            staged: Mutex::new(Vec::new()),
        }
    }

    fn require_id(id: Option<Uuid>, kind: &str) -> Result<Uuid, StoreError> {
        id.ok_or_else(|| {
            StoreError::Backend(format!("cannot stage a {kind} without an identifier"))
        })
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE confirmation_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    async fn user_in_subscription(
        &self,
        subscription_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE subscription_id = $1 AND email = $2"
        ))
        .bind(subscription_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn subscription_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT id, name, created_at, created_by FROM subscriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn stage_account(&self, account: &Account) -> Result<(), StoreError> {
        Self::require_id(account.id, "account")?;
        self.staged
            .lock()
            .await
            .push(StagedWrite::Account(account.clone()));
        Ok(())
    }

    async fn stage_account_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.staged.lock().await.push(StagedWrite::AccountRemoval(id));
        Ok(())
    }

    async fn stage_user(&self, user: &User) -> Result<(), StoreError> {
        Self::require_id(user.id, "user")?;
        self.staged.lock().await.push(StagedWrite::User(user.clone()));
        Ok(())
    }

    async fn stage_user_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.staged.lock().await.push(StagedWrite::UserRemoval(id));
        Ok(())
    }

    async fn stage_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        Self::require_id(subscription.id, "subscription")?;
        self.staged
            .lock()
            .await
            .push(StagedWrite::Subscription(subscription.clone()));
        Ok(())
    }

    async fn stage_subscription_removal(&self, id: Uuid) -> Result<(), StoreError> {
        self.staged
            .lock()
            .await
            .push(StagedWrite::SubscriptionRemoval(id));
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let writes: Vec<StagedWrite> = {
            let mut staged = self.staged.lock().await;
            staged.drain(..).collect()
        };

        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for write in writes {
            match write {
                StagedWrite::Account(account) => {
                    // created_at/created_by are written once and left alone
                    // on conflict; the gateway owns stamping.
                    sqlx::query(
                        r#"
                        INSERT INTO accounts (id, email, password_hash, confirmation_token,
                                              confirmation_requested_at, current_user_id,
                                              subscription_id, created_at, created_by)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                        ON CONFLICT (id) DO UPDATE SET
                            email = EXCLUDED.email,
                            password_hash = EXCLUDED.password_hash,
                            confirmation_token = EXCLUDED.confirmation_token,
                            confirmation_requested_at = EXCLUDED.confirmation_requested_at,
                            current_user_id = EXCLUDED.current_user_id,
                            subscription_id = EXCLUDED.subscription_id
                        "#,
                    )
                    .bind(account.id)
                    .bind(&account.email)
                    .bind(&account.password_hash)
                    .bind(&account.confirmation_token)
                    .bind(account.confirmation_requested_at)
                    .bind(account.current_user_id)
                    .bind(account.subscription_id)
                    .bind(account.audit.created_at)
                    .bind(account.audit.created_by)
                    .execute(&mut *tx)
                    .await?;
                }
                StagedWrite::AccountRemoval(id) => {
                    sqlx::query("DELETE FROM accounts WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                StagedWrite::User(user) => {
                    sqlx::query(
                        r#"
                        INSERT INTO users (id, username, email, password_hash,
                                           subscription_id, created_at, created_by)
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        ON CONFLICT (id) DO UPDATE SET
                            username = EXCLUDED.username,
                            email = EXCLUDED.email,
                            password_hash = EXCLUDED.password_hash,
                            subscription_id = EXCLUDED.subscription_id
                        "#,
                    )
                    .bind(user.id)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(user.subscription_id)
                    .bind(user.audit.created_at)
                    .bind(user.audit.created_by)
                    .execute(&mut *tx)
                    .await?;
                }
                StagedWrite::UserRemoval(id) => {
                    sqlx::query("DELETE FROM users WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                StagedWrite::Subscription(subscription) => {
                    sqlx::query(
                        r#"
                        INSERT INTO subscriptions (id, name, created_at, created_by)
                        VALUES ($1, $2, $3, $4)
                        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
                        "#,
                    )
                    .bind(subscription.id)
                    .bind(&subscription.name)
                    .bind(subscription.audit.created_at)
                    .bind(subscription.audit.created_by)
                    .execute(&mut *tx)
                    .await?;
                }
                StagedWrite::SubscriptionRemoval(id) => {
                    sqlx::query("DELETE FROM subscriptions WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
