//! Anonymous receipt staging and claim handlers.
//!
//! Staging is the only unauthenticated write surface: a visitor uploads a
//! receipt before signing up, and the row waits in storage until the visitor
//! authenticates and claims it (or the TTL runs out).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use corra_coins_core::{validate_bill_amount, BrandId, ReceiptId, SessionId, StagedReceipt};
use corra_coins_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::state::AppState;

/// Request to stage a receipt for later claiming.
#[derive(Debug, Deserialize)]
pub struct StageReceiptRequest {
    /// Anonymous session identifier minted by the client.
    pub session_id: String,
    /// Brand the bill was incurred at.
    pub brand_id: String,
    /// Claimed bill amount in whole currency units.
    pub bill_amount: i64,
    /// URL of the uploaded receipt image.
    pub receipt_url: String,
    /// Original file name, if the client kept it.
    pub file_name: Option<String>,
    /// Brand earn percentage at upload time.
    pub earn_percent: u8,
    /// Bill date as stated on the receipt (YYYY-MM-DD).
    pub bill_date: Option<NaiveDate>,
}

/// Staged receipt response.
#[derive(Debug, Serialize)]
pub struct StagedReceiptResponse {
    /// Receipt ID to claim with.
    pub id: String,
    /// Session that staged the upload.
    pub session_id: String,
    /// Brand the bill was incurred at.
    pub brand_id: String,
    /// Bill amount in whole currency units.
    pub bill_amount: i64,
    /// Coins this receipt will earn once claimed and approved.
    pub coins_earned: i64,
    /// When the unclaimed row expires.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&StagedReceipt> for StagedReceiptResponse {
    fn from(receipt: &StagedReceipt) -> Self {
        Self {
            id: receipt.id.to_string(),
            session_id: receipt.session_id.to_string(),
            brand_id: receipt.brand_id.to_string(),
            bill_amount: receipt.bill_amount,
            coins_earned: receipt.coins_earned(),
            expires_at: receipt.expires_at.to_rfc3339(),
            created_at: receipt.created_at.to_rfc3339(),
        }
    }
}

/// Stage a receipt from an anonymous session.
pub async fn stage_receipt(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StageReceiptRequest>,
) -> Result<Json<StagedReceiptResponse>, ApiError> {
    validate_bill_amount(body.bill_amount)?;
    if body.earn_percent == 0 || body.earn_percent > 100 {
        return Err(ApiError::BadRequest(
            "earn_percent must be between 1 and 100".into(),
        ));
    }
    if body.receipt_url.is_empty() {
        return Err(ApiError::BadRequest("receipt_url is required".into()));
    }

    let session_id = body
        .session_id
        .parse::<SessionId>()
        .map_err(|_| ApiError::BadRequest("invalid session_id".into()))?;
    let brand_id = body
        .brand_id
        .parse::<BrandId>()
        .map_err(|_| ApiError::BadRequest("invalid brand_id".into()))?;

    let receipt = StagedReceipt::new(
        session_id,
        brand_id,
        body.bill_amount,
        body.receipt_url,
        body.file_name,
        body.earn_percent,
        body.bill_date,
        state.config.receipt_ttl_minutes,
    );

    state.store.stage_receipt(&receipt)?;

    tracing::info!(
        receipt_id = %receipt.id,
        session_id = %receipt.session_id,
        brand_id = %receipt.brand_id,
        bill_amount = %receipt.bill_amount,
        "Receipt staged"
    );

    Ok(Json(StagedReceiptResponse::from(&receipt)))
}

/// Claim a staged receipt for the authenticated user.
///
/// Creates a `pending` EARN transaction; coins are credited only after
/// admin approval.
pub async fn claim_receipt(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(receipt_id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let receipt_id = receipt_id
        .parse::<ReceiptId>()
        .map_err(|_| ApiError::BadRequest("invalid receipt id".into()))?;

    let transaction = state
        .store
        .claim_receipt(&receipt_id, &auth.user_id, Utc::now())?;

    tracing::info!(
        receipt_id = %receipt_id,
        user_id = %auth.user_id,
        transaction_id = %transaction.id,
        coins_earned = %transaction.coins_earned,
        "Receipt claimed"
    );

    Ok(Json(TransactionResponse::from(&transaction)))
}
