//! Application state.

use std::sync::Arc;

use corra_coins_store::RocksStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        if config.admin_api_key.is_none() {
            tracing::warn!("Admin API key not configured - admin endpoints will reject all requests");
        }
        if config.payout_webhook_secret.is_none() {
            tracing::warn!("Payout webhook secret not configured - signature verification disabled");
        }

        Self { store, config }
    }
}
