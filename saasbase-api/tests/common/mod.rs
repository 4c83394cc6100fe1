/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - App construction over the in-memory storage backend
/// - Account/user/subscription seeding
/// - JWT token generation
/// - Request/response helpers
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use saasbase_api::app::{build_router, AppState};
use saasbase_api::config::Config;
use saasbase_shared::auth::jwt::{create_token, Claims};
use saasbase_shared::events::{ChannelEventBus, DomainEvent};
use saasbase_shared::models::{Account, ApiResource, Subscription, User};
use saasbase_shared::store::memory::MemoryStore;
use saasbase_shared::store::AccountStore;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
    pub events: UnboundedReceiver<DomainEvent>,
}

impl TestContext {
    /// Creates a new test context over a fresh in-memory store
    pub fn new() -> Self {
        let config = Config::for_tests();
        let store = Arc::new(MemoryStore::new());
        let (bus, events) = ChannelEventBus::channel();

        let state = AppState::new(store.clone(), Arc::new(bus), config.clone());
        let app = build_router(state);

        Self {
            store,
            app,
            config,
            events,
        }
    }

    /// Seeds a persisted account and returns it
    pub async fn seed_account(&self, email: &str) -> Account {
        let mut account = Account::new();
        account.set_id(Uuid::new_v4());
        account.email = email.to_string();
        account.password_hash = "$argon2id$seeded".to_string();

        self.store.stage_account(&account).await.unwrap();
        self.store.commit().await.unwrap();
        account
    }

    /// Seeds a subscription with one user carrying the given email
    pub async fn seed_subscription_with_user(&self, email: &str) -> (Subscription, User) {
        let mut subscription = Subscription::new("acme");
        subscription.set_id(Uuid::new_v4());

        let mut user = User::new("jane", email, "hash", subscription.id);
        user.set_id(Uuid::new_v4());

        self.store.stage_subscription(&subscription).await.unwrap();
        self.store.stage_user(&user).await.unwrap();
        self.store.commit().await.unwrap();
        (subscription, user)
    }

    /// Persists a modified account
    pub async fn save_account(&self, account: &Account) {
        self.store.stage_account(account).await.unwrap();
        self.store.commit().await.unwrap();
    }

    /// Returns an Authorization header value for the account
    pub fn auth_header(&self, account_id: Uuid) -> String {
        let token = create_token(&Claims::new(account_id), &self.config.jwt.secret).unwrap();
        format!("Bearer {token}")
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::Body> {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Builds a JSON request
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a bodyless request
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Reads a response body as JSON
pub async fn response_json(response: Response<axum::body::Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Reads a response body as raw bytes
pub async fn response_bytes(response: Response<axum::body::Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
