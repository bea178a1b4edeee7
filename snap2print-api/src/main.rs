//! # Snap2Print API Server
//!
//! Accepts print jobs from students and serves the shop owner dashboard.
//!
//! The job store is Postgres when `DATABASE_URL` is set and an in-memory
//! store otherwise; uploads go to S3-compatible storage when fully
//! configured and to the local uploads directory otherwise.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p snap2print-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use snap2print_api::{
    app::{build_router, AppState},
    config::Config,
};
use snap2print_shared::{
    db::pool::DatabaseConfig,
    storage::StorageRouter,
    store::{MemoryStore, PostgresStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snap2print_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Snap2Print API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            let db_config = DatabaseConfig {
                max_connections: db.max_connections,
                ..DatabaseConfig::new(db.url.clone())
            };
            let store = PostgresStore::connect(db_config)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Using PostgreSQL job store");
            Arc::new(store)
        }
        None if config.seed_demo_shop => {
            tracing::warn!("DATABASE_URL not set; using in-memory job store with demo shop");
            Arc::new(MemoryStore::with_demo_shop())
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory job store");
            Arc::new(MemoryStore::new())
        }
    };

    let storage = StorageRouter::from_config(config.storage_config())
        .await
        .context("Failed to initialise upload storage")?;
    tracing::info!(backend = %storage.kind(), "Upload storage ready");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, storage, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
