//! Club Corra Coins Service - HTTP API for the coin ledger
//!
//! This is the main entry point for the corra-coins service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corra_coins_service::{create_router, AppState, ServiceConfig};
use corra_coins_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,corra_coins=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Corra Coins Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        welcome_bonus_coins = %config.welcome_bonus_coins,
        receipt_ttl_minutes = %config.receipt_ttl_minutes,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Periodic purge of expired and claimed staging rows. Best-effort
    // hygiene; claim-time expiry checks are the correctness guard.
    let purge_store = Arc::clone(&store);
    let purge_interval = Duration::from_secs(config.purge_interval_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match purge_store.purge_expired(chrono::Utc::now()) {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged = %purged, "Purged staging rows"),
                Err(e) => tracing::warn!(error = %e, "Staging purge failed"),
            }
        }
    });

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
