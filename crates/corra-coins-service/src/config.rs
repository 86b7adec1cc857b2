//! Service configuration.

use corra_coins_core::{DEFAULT_RECEIPT_TTL_MINUTES, DEFAULT_WELCOME_BONUS_COINS};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/corra-coins").
    pub data_dir: String,

    /// JWT validation base URL.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "corra-coins").
    pub auth_audience: String,

    /// API key for admin endpoints.
    pub admin_api_key: Option<String>,

    /// Shared secret for payout webhook signatures (optional; verification
    /// is skipped in development when unset).
    pub payout_webhook_secret: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Coins granted once per user at registration.
    pub welcome_bonus_coins: i64,

    /// How long a staged receipt stays claimable, in minutes.
    pub receipt_ttl_minutes: i64,

    /// How often the expired-receipt purge runs, in seconds.
    pub purge_interval_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/corra-coins".into()),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.clubcorra.com".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "corra-coins".into()),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            payout_webhook_secret: std::env::var("PAYOUT_WEBHOOK_SECRET").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            welcome_bonus_coins: std::env::var("WELCOME_BONUS_COINS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WELCOME_BONUS_COINS),
            receipt_ttl_minutes: std::env::var("RECEIPT_TTL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RECEIPT_TTL_MINUTES),
            purge_interval_seconds: std::env::var("PURGE_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        }
    }
}
