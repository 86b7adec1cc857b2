//! Club Corra coins HTTP API service.
//!
//! This crate provides the HTTP API for the coin ledger, including:
//!
//! - Anonymous receipt staging and authenticated claiming
//! - Coin balance and transaction history
//! - Redemption requests
//! - Admin verification (approve / reject / adjust) and reconciliation
//! - Payout provider webhooks
//!
//! # Authentication
//!
//! End-user requests carry a `Bearer` JWT validated against the auth
//! provider's JWKS. Admin endpoints use the `X-Admin-Key` API key. Receipt
//! staging is deliberately unauthenticated.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
