/// Password-reset state machine
///
/// An account moves between two states: no reset pending and reset pending.
///
/// - **Request** issues a fresh confirmation token, gated by a cooldown
///   window: while a recent request is pending, further requests are
///   rejected without touching the stored token. Outside the window a new
///   request simply overwrites the old token.
/// - **Consume** exchanges a valid token plus a valid new password for a
///   password change, clearing token and requested-at together. A failed
///   validation leaves the token intact so the caller can retry.
///
/// Both transitions persist through the [`AccountManager`] and announce
/// themselves on the [`EventBus`]; the mailer listens for
/// `PasswordResetRequested` to deliver the token.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::auth::password::{self, PasswordError};
use crate::auth::token::generate_confirmation_token;
use crate::events::{DomainEvent, EventBus};
use crate::manager::AccountManager;
use crate::models::Account;
use crate::store::StoreError;

/// Default cooldown between reset requests, in seconds (60 hours)
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 216_000;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A single field validation failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error type for reset transitions
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// No account matches the given email
    #[error("no account for the given email")]
    AccountNotFound,

    /// A reset is already pending and the cooldown has not elapsed
    #[error("a reset was requested too recently")]
    TooSoon,

    /// No confirmation token was provided
    #[error("no confirmation token provided")]
    MissingToken,

    /// The confirmation token matches no account
    #[error("confirmation token does not match any account")]
    InvalidToken,

    /// The submitted new password is invalid; the token stays valid
    #[error("password validation failed")]
    ValidationFailed(Vec<FieldError>),

    /// Storage failure, fatal for the request
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failure, fatal for the request
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Validates a submitted plaintext password
///
/// The concrete rules are a collaborator concern; this mirrors the rule the
/// signup form applies.
pub fn validate_plain_password(password: &str) -> Result<(), Vec<FieldError>> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(vec![FieldError {
            field: "plainPassword".to_string(),
            message: format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        }]);
    }
    Ok(())
}

/// The password-reset state machine
#[derive(Clone)]
pub struct PasswordReset {
    manager: AccountManager,
    events: Arc<dyn EventBus>,
    cooldown: Duration,
}

impl PasswordReset {
    pub fn new(manager: AccountManager, events: Arc<dyn EventBus>, cooldown_seconds: i64) -> Self {
        Self {
            manager,
            events,
            cooldown: Duration::seconds(cooldown_seconds),
        }
    }

    /// Transition 1: request a reset for the account behind `email`
    ///
    /// Rejected with `TooSoon` while a previous request is younger than the
    /// cooldown window; two rapid requests issue exactly one token.
    pub async fn request(&self, email: &str, now: DateTime<Utc>) -> Result<Account, ResetError> {
        let mut account = self
            .manager
            .account_by_email(email)
            .await?
            .ok_or(ResetError::AccountNotFound)?;

        if let Some(requested_at) = account.confirmation_requested_at {
            if now - requested_at < self.cooldown {
                return Err(ResetError::TooSoon);
            }
        }

        account.issue_confirmation(generate_confirmation_token(), now);
        self.manager.update(&mut account, None, true).await?;

        if let (Some(account_id), Some(token)) = (account.id, account.confirmation_token.clone()) {
            self.events.publish(DomainEvent::PasswordResetRequested {
                account_id,
                email: account.email.clone(),
                confirmation_token: token,
            });
        }

        Ok(account)
    }

    /// Transition 2: consume a confirmation token and set a new password
    ///
    /// An empty token fails before any storage lookup. A validation failure
    /// mutates nothing and keeps the token consumable.
    pub async fn consume(&self, token: &str, plain_password: &str) -> Result<Account, ResetError> {
        if token.trim().is_empty() {
            return Err(ResetError::MissingToken);
        }

        let mut account = self
            .manager
            .account_by_confirmation_token(token)
            .await?
            .ok_or(ResetError::InvalidToken)?;

        validate_plain_password(plain_password).map_err(ResetError::ValidationFailed)?;

        let hash = password::hash_password(plain_password)?;
        account.apply_password(hash);
        self.manager.update(&mut account, None, true).await?;

        if let Some(account_id) = account.id {
            self.events.publish(DomainEvent::PasswordUpdated { account_id });
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelEventBus;
    use crate::store::memory::MemoryStore;

    struct Fixture {
        reset: PasswordReset,
        manager: AccountManager,
        store: Arc<MemoryStore>,
        rx: tokio::sync::mpsc::UnboundedReceiver<DomainEvent>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let manager = AccountManager::new(store.clone());
        let (bus, rx) = ChannelEventBus::channel();
        let reset = PasswordReset::new(manager.clone(), Arc::new(bus), DEFAULT_COOLDOWN_SECONDS);

        let mut account = manager.create();
        account.email = "a@x.com".to_string();
        account.password_hash = "$argon2id$old".to_string();
        manager.update(&mut account, None, true).await.unwrap();

        Fixture {
            reset,
            manager,
            store,
            rx,
        }
    }

    #[tokio::test]
    async fn test_request_issues_token_and_event() {
        let mut f = fixture().await;
        let now = Utc::now();

        let account = f.reset.request("a@x.com", now).await.unwrap();
        assert!(account.has_pending_reset());
        assert_eq!(account.confirmation_requested_at, Some(now));

        match f.rx.try_recv().unwrap() {
            DomainEvent::PasswordResetRequested {
                email,
                confirmation_token,
                ..
            } => {
                assert_eq!(email, "a@x.com");
                assert_eq!(Some(confirmation_token), account.confirmation_token);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_unknown_email_not_found() {
        let f = fixture().await;
        let result = f.reset.request("nobody@x.com", Utc::now()).await;
        assert!(matches!(result, Err(ResetError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_second_request_within_cooldown_rejected() {
        let f = fixture().await;
        let now = Utc::now();

        let first = f.reset.request("a@x.com", now).await.unwrap();
        let result = f.reset.request("a@x.com", now + Duration::seconds(1)).await;
        assert!(matches!(result, Err(ResetError::TooSoon)));

        // Stored token unchanged.
        let stored = f
            .manager
            .account_by_email("a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.confirmation_token, first.confirmation_token);
    }

    #[tokio::test]
    async fn test_request_after_cooldown_issues_fresh_token() {
        let f = fixture().await;
        let now = Utc::now();

        let first = f.reset.request("a@x.com", now).await.unwrap();
        let later = now + Duration::seconds(DEFAULT_COOLDOWN_SECONDS);
        let second = f.reset.request("a@x.com", later).await.unwrap();

        assert_ne!(first.confirmation_token, second.confirmation_token);
        assert_eq!(second.confirmation_requested_at, Some(later));
    }

    #[tokio::test]
    async fn test_consume_clears_token_and_timestamp_together() {
        let f = fixture().await;
        let issued = f.reset.request("a@x.com", Utc::now()).await.unwrap();
        let token = issued.confirmation_token.clone().unwrap();

        let account = f.reset.consume(&token, "brand-new-password").await.unwrap();
        assert!(account.confirmation_token.is_none());
        assert!(account.confirmation_requested_at.is_none());
        assert!(
            password::verify_password("brand-new-password", &account.password_hash).unwrap()
        );

        // The old token is gone for good.
        let retry = f.reset.consume(&token, "another-password").await;
        assert!(matches!(retry, Err(ResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_consume_empty_token_performs_no_lookup() {
        let f = fixture().await;
        let result = f.reset.consume("", "whatever-password").await;
        assert!(matches!(result, Err(ResetError::MissingToken)));
        assert_eq!(f.store.confirmation_token_lookups(), 0);
    }

    #[tokio::test]
    async fn test_consume_unknown_token_invalid() {
        let f = fixture().await;
        let result = f.reset.consume("no-such-token", "whatever-password").await;
        assert!(matches!(result, Err(ResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_consume_invalid_password_keeps_token() {
        let f = fixture().await;
        let issued = f.reset.request("a@x.com", Utc::now()).await.unwrap();
        let token = issued.confirmation_token.clone().unwrap();

        let result = f.reset.consume(&token, "short").await;
        assert!(matches!(result, Err(ResetError::ValidationFailed(_))));

        // Token still consumable afterwards.
        let account = f.reset.consume(&token, "long-enough-password").await.unwrap();
        assert!(account.confirmation_token.is_none());
    }
}
