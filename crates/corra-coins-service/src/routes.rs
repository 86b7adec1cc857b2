//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, coins, health, receipts, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for the anonymous staging endpoint.
/// Staging is open to the internet, so it gets its own tighter limit.
const STAGING_MAX_CONCURRENT_REQUESTS: usize = 25;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Anonymous intake (concurrency-limited)
/// - `POST /v1/receipts` - Stage a receipt before signup
///
/// ## User (JWT auth)
/// - `POST /v1/accounts` - Register and receive the welcome bonus
/// - `GET /v1/accounts/me` - Get the current user's ledger account
/// - `POST /v1/receipts/{id}/claim` - Claim a staged receipt
/// - `GET /v1/coins/balance` - Get current balance
/// - `GET /v1/coins/transactions` - List transaction history
/// - `POST /v1/coins/redeem` - Request a redemption
///
/// ## Admin (API key auth)
/// - `GET /v1/admin/transactions` - Review queue
/// - `POST /v1/admin/transactions/{id}/approve` - Approve
/// - `POST /v1/admin/transactions/{id}/reject` - Reject / reverse
/// - `GET /v1/admin/stats` - Reconciliation aggregates
/// - `POST /v1/admin/adjustments` - Manual balance correction
/// - `POST /v1/admin/receipts/purge` - Purge staging rows now
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/payouts` - Payout provider results
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Anonymous staging gets its own concurrency limit: it is the only
    // unauthenticated write surface.
    let staging_routes = Router::new()
        .route("/", post(receipts::stage_receipt))
        .route("/:id/claim", post(receipts::claim_receipt))
        .layer(ConcurrencyLimitLayer::new(STAGING_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Coins
        .route("/coins/balance", get(coins::get_balance))
        .route("/coins/transactions", get(coins::list_transactions))
        .route("/coins/redeem", post(coins::redeem_coins))
        // Admin
        .route("/admin/transactions", get(admin::list_transactions))
        .route(
            "/admin/transactions/:id/approve",
            post(admin::approve_transaction),
        )
        .route(
            "/admin/transactions/:id/reject",
            post(admin::reject_transaction),
        )
        .route("/admin/stats", get(admin::get_stats))
        .route("/admin/adjustments", post(admin::apply_adjustment))
        .route("/admin/receipts/purge", post(admin::purge_receipts))
        // Receipt staging (with its own concurrency limit)
        .nest("/receipts", staging_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - delivery is controlled by the provider)
        .route("/webhooks/payouts", post(webhooks::payout_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
