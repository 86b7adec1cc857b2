//! Payout provider webhook handler.
//!
//! The payout provider calls back with the terminal result of a fiat
//! transfer. Delivery is at-least-once, so re-delivery for a transaction
//! that already settled is acknowledged without effect.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use corra_coins_core::TransactionId;
use corra_coins_store::Store;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;
use crate::state::AppState;

/// Payout result payload.
#[derive(Debug, Deserialize)]
pub struct PayoutWebhook {
    /// The coin transaction the payout belongs to.
    pub transaction_id: String,
    /// Whether the transfer settled.
    pub success: bool,
    /// Provider's own reference, logged for reconciliation.
    pub provider_reference: Option<String>,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
    /// Status the transaction landed in.
    pub status: String,
}

/// Handle payout result webhooks.
///
/// Success drives the transaction to `paid`; failure to `unpaid` or
/// `failed` depending on how far the payout got. The coin ledger is never
/// touched either way.
pub async fn payout_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    // Verify signature over the raw body if a secret is configured
    if let Some(secret) = &state.config.payout_webhook_secret {
        let signature = headers
            .get("x-payout-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing payout signature".into()))?;

        let expected = hmac_sha256_hex(secret, &body);
        if !constant_time_eq(signature, &expected) {
            tracing::warn!("Invalid payout webhook signature");
            return Err(ApiError::BadRequest("Invalid webhook signature".into()));
        }
    } else {
        tracing::warn!("Payout webhook secret not configured - skipping signature verification");
    }

    let webhook: PayoutWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let transaction_id = webhook
        .transaction_id
        .parse::<TransactionId>()
        .map_err(|_| ApiError::BadRequest("invalid transaction_id".into()))?;

    let transaction = state
        .store
        .record_payment_result(&transaction_id, webhook.success)?;

    tracing::info!(
        transaction_id = %transaction_id,
        success = %webhook.success,
        status = %transaction.status,
        provider_reference = ?webhook.provider_reference,
        "Payout result recorded"
    );

    Ok(Json(WebhookResponse {
        received: true,
        status: transaction.status.to_string(),
    }))
}
