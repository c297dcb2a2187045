//! Equipment SKU Service
//!
//! Allocates collision-free SKUs for equipment instances and serves the
//! admin API over the sequence counters.

use std::sync::Arc;

use anyhow::Result;
use epg_sku_service::{
    allocator::SkuAllocator,
    api,
    config::{self, StorageBackend},
    db::{Database, MemoryStore, Stores},
    state::AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to EPG_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting SKU service");
    info!(
        listen_addr = %config.listen_addr,
        storage = ?config.storage,
        org_prefix = %config.sku_format.org_prefix(),
        sequence_width = config.sku_format.sequence_width(),
        "Configuration loaded"
    );

    let prefixes = match config.prefix_resolver() {
        Ok(prefixes) => prefixes,
        Err(e) => {
            error!(error = %e, "Failed to load prefix table");
            return Err(e.into());
        }
    };
    info!(
        categories = prefixes.category_count(),
        brands = prefixes.brand_count(),
        "Prefix table loaded"
    );

    let (db, stores) = match config.storage {
        StorageBackend::Postgres => {
            let db = match Database::connect(&config.database).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            // Run migrations in dev mode
            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }

            let stores = Stores::postgres(&db);
            (Some(db), stores)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; sequence counters will not survive a restart");
            (None, Stores::memory(Arc::new(MemoryStore::new())))
        }
    };

    let allocator = SkuAllocator::new(config.sku_format.clone(), prefixes, &stores);

    // Create application state
    let state = AppState::new(db, allocator);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("SKU service shutdown complete");
    Ok(())
}
