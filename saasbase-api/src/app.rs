/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
use crate::config::Config;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use saasbase_shared::{
    auth::{context::Principal, jwt},
    binding::SubscriptionBinding,
    events::EventBus,
    manager::AccountManager,
    reset::PasswordReset,
    store::AccountStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend behind the domain services
    pub store: Arc<dyn AccountStore>,

    /// Account lookups and audit-stamped writes
    pub manager: AccountManager,

    /// Password-reset state machine
    pub reset: PasswordReset,

    /// Active-user binding
    pub binding: SubscriptionBinding,

    /// Outbound domain events
    pub events: Arc<dyn EventBus>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the domain services over the given backend
    pub fn new(store: Arc<dyn AccountStore>, events: Arc<dyn EventBus>, config: Config) -> Self {
        let manager = AccountManager::new(store.clone());
        let reset = PasswordReset::new(
            manager.clone(),
            events.clone(),
            config.settings.password_reset_time,
        );
        let binding = SubscriptionBinding::new(manager.clone(), events.clone());

        Self {
            store,
            manager,
            reset,
            binding,
            events,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                           # Health check (public)
/// └── /account/
///     ├── POST   /                      # Signup
///     ├── DELETE /password?email=…      # Request a password reset
///     ├── POST   /password              # Consume a reset token
///     └── PUT    /subscription/:id      # Bind the active user (JWT)
/// ```
///
/// The subscription route is only mounted when the deployment runs as
/// software-as-a-service; single-tenant installs have no subscriptions to
/// bind.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Signup and password reset (public, no auth required)
    let mut account_routes = Router::new()
        .route("/", post(routes::account::create_account))
        .route(
            "/password",
            axum::routing::delete(routes::account::request_password_reset)
                .post(routes::account::confirm_password_reset),
        );

    // Active-user binding (requires JWT authentication)
    if state.config.settings.software_as_a_service {
        let subscription_routes = Router::new()
            .route(
                "/subscription/:subscription_id",
                put(routes::account::bind_subscription_user),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                jwt_auth_layer,
            ));
        account_routes = account_routes.merge(subscription_routes);
    }

    Router::new()
        .merge(health_routes)
        .nest("/account", account_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token from the Authorization header,
/// then injects the authenticated [`Principal`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("missingAuthorizationHeader".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::BadRequest("expectedBearerToken".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(Principal {
        account_id: claims.sub,
    });

    Ok(next.run(req).await)
}
