//! # SaasBase Account API Server
//!
//! REST surface for the account/identity module:
//! - Account registration
//! - Password-reset request and confirmation
//! - Per-account active-user binding
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p saasbase-api
//! ```

use std::sync::Arc;

use saasbase_api::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
};
use saasbase_shared::{
    events::ChannelEventBus,
    store::{memory::MemoryStore, postgres::PgStore, AccountStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saasbase_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "SaasBase Account API v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn AccountStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres"))?;
            Arc::new(PgStore::connect(url, config.storage.max_connections).await?)
        }
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory storage backend; data will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    // Domain events stay fire-and-forget for the core; a consumer drains
    // them here. Delivery (reset emails with the confirmation token) hangs
    // off this receiver.
    let (events, mut event_rx) = ChannelEventBus::channel();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::info!(?event, "domain event");
        }
    });

    let bind_address = config.bind_address();
    let state = AppState::new(store, Arc::new(events), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{bind_address}");

    axum::serve(listener, app).await?;

    Ok(())
}
