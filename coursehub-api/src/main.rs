//! # CourseHub API Server
//!
//! Serves course outlines, course authoring and the subscription review
//! workflow over HTTP.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Course outlines assembled from modules, lessons and resources
//! - Admin course authoring with banner and resource uploads
//! - Subscription requests with payment receipts and their review
//! - Bearer authentication (JWT)
//!
//! Without `DATABASE_URL` the server runs on the in-memory document store,
//! which is convenient for local development but loses all data on exit.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p coursehub-api
//! ```

use anyhow::Context;
use coursehub_api::{
    app::{build_router, AppState},
    config::Config,
};
use coursehub_shared::{
    assets::{fs::FsAssetStore, AssetStore},
    db::migrations::get_migration_status,
    db::pool::{close_pool, create_pool, DatabaseConfig as PoolConfig},
    store::{memory::MemoryStore, postgres::PgDocumentStore, DocumentStore},
    timeout::{CallTimeout, TimedAssetStore, TimedStore},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coursehub_api=debug,coursehub_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "CourseHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    let timeout = CallTimeout::from_millis(Some(config.store_timeout_ms));

    let mut pool = None;
    let store: Arc<dyn DocumentStore> = match &config.database {
        Some(database) => {
            let pg = create_pool(PoolConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;

            let store = PgDocumentStore::new(pg.clone());
            store.migrate().await.context("Failed to run migrations")?;
            let status = get_migration_status(&pg)
                .await
                .context("Failed to read migration status")?;
            tracing::info!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                "Database schema up to date"
            );

            pool = Some(pg);
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    let assets: Arc<dyn AssetStore> = Arc::new(FsAssetStore::new(
        config.assets.root.clone(),
        config.assets.public_url.clone(),
    ));
    tracing::info!(root = %config.assets.root, "Asset storage ready");

    let store: Arc<dyn DocumentStore> = Arc::new(TimedStore::new(store, timeout));
    let assets: Arc<dyn AssetStore> = Arc::new(TimedAssetStore::new(assets, timeout));

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, assets, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
