//! Admin verification and reconciliation handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use corra_coins_core::{BrandId, TransactionId, TransactionStatus, TransactionType, UserId};
use corra_coins_store::{Approval, CoinStats, Rejection, Store, TransactionFilter};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::state::AppState;

/// Default page size for the admin transaction queue.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum page size for the admin transaction queue.
const MAX_PAGE_SIZE: usize = 500;

/// Query parameters for the admin transaction listing.
#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    /// Filter by user.
    pub user_id: Option<String>,
    /// Filter by status (e.g. `pending`).
    pub status: Option<String>,
    /// Filter by type (e.g. `earn`).
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Filter by brand.
    pub brand_id: Option<String>,
    /// Page size (default 50, max 500).
    pub limit: Option<usize>,
    /// Pagination offset.
    pub offset: Option<usize>,
}

/// Admin transaction list response.
#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Page size used.
    pub limit: usize,
    /// Offset used.
    pub offset: usize,
}

/// List transactions across all users for the review queue.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponse>, ApiError> {
    let user_id = query
        .user_id
        .as_deref()
        .map(str::parse::<UserId>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("invalid user_id".into()))?;
    let brand_id = query
        .brand_id
        .as_deref()
        .map(str::parse::<BrandId>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("invalid brand_id".into()))?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TransactionStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let transaction_type = query
        .transaction_type
        .as_deref()
        .map(str::parse::<TransactionType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let filter = TransactionFilter {
        user_id,
        status,
        transaction_type,
        brand_id,
    };

    let transactions = state.store.list_transactions(&filter, limit, offset)?;

    tracing::debug!(
        admin_id = %admin.admin_id,
        count = %transactions.len(),
        "Admin listed transactions"
    );

    Ok(Json(AdminListResponse {
        transactions: transactions.iter().map(TransactionResponse::from).collect(),
        limit,
        offset,
    }))
}

/// Approval request body.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    /// Optional reviewer notes recorded on the transaction.
    pub admin_notes: Option<String>,
}

/// Approval response.
#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    /// The transaction after approval.
    pub transaction: TransactionResponse,
    /// Whether this call mutated the ledger. `false` means the transaction
    /// was already approved and the call was a no-op.
    pub applied: bool,
    /// Balance after approval, when this call applied it.
    pub new_balance: Option<i64>,
}

/// Approve a pending transaction, moving its coins.
///
/// Idempotent: re-approving returns the approved transaction with
/// `applied: false` and leaves the ledger alone.
pub async fn approve_transaction(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(transaction_id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let transaction_id = transaction_id
        .parse::<TransactionId>()
        .map_err(|_| ApiError::BadRequest("invalid transaction id".into()))?;

    let admin_notes = body.and_then(|Json(b)| b.admin_notes);

    let approval = state
        .store
        .approve_transaction(&transaction_id, admin_notes)?;

    let (applied, new_balance) = match &approval {
        Approval::Applied { new_balance, .. } => (true, Some(*new_balance)),
        Approval::AlreadyApproved { .. } => (false, None),
    };

    tracing::info!(
        admin_id = %admin.admin_id,
        transaction_id = %transaction_id,
        applied = %applied,
        "Transaction approval"
    );

    Ok(Json(ApproveResponse {
        transaction: TransactionResponse::from(approval.transaction()),
        applied,
        new_balance,
    }))
}

/// Rejection request body. A note is required: users see it.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Reason for the rejection.
    pub note: String,
}

/// Rejection response.
#[derive(Debug, Serialize)]
pub struct RejectResponse {
    /// The transaction after rejection.
    pub transaction: TransactionResponse,
    /// Whether an already-applied ledger mutation was reversed.
    pub reversed: bool,
    /// Balance after reversal, when one happened.
    pub new_balance: Option<i64>,
}

/// Reject a transaction.
///
/// Rejecting a `pending` transaction is status-only. Rejecting an
/// `approved` one reverses the ledger to its pre-approval snapshot.
pub async fn reject_transaction(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(transaction_id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<RejectResponse>, ApiError> {
    let transaction_id = transaction_id
        .parse::<TransactionId>()
        .map_err(|_| ApiError::BadRequest("invalid transaction id".into()))?;

    if body.note.trim().is_empty() {
        return Err(ApiError::BadRequest("a rejection note is required".into()));
    }

    let rejection = state.store.reject_transaction(&transaction_id, body.note)?;

    let (reversed, new_balance) = match &rejection {
        Rejection::Reversed { new_balance, .. } => (true, Some(*new_balance)),
        Rejection::Rejected { .. } | Rejection::AlreadyRejected { .. } => (false, None),
    };

    tracing::info!(
        admin_id = %admin.admin_id,
        transaction_id = %transaction_id,
        reversed = %reversed,
        "Transaction rejected"
    );

    Ok(Json(RejectResponse {
        transaction: TransactionResponse::from(rejection.transaction()),
        reversed,
        new_balance,
    }))
}

/// Dashboard stats response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Sum of all spendable balances.
    pub total_coins_in_circulation: i64,
    /// Welcome bonuses granted.
    pub welcome_bonuses_given: u64,
    /// Coins locked in pending redemptions.
    pub pending_redemptions: i64,
    /// Earn requests awaiting review.
    pub pending_earn_requests: u64,
    /// Ledger accounts.
    pub total_users: u64,
}

impl From<CoinStats> for StatsResponse {
    fn from(stats: CoinStats) -> Self {
        Self {
            total_coins_in_circulation: stats.total_coins_in_circulation,
            welcome_bonuses_given: stats.welcome_bonuses_given,
            pending_redemptions: stats.pending_redemptions,
            pending_earn_requests: stats.pending_earn_requests,
            total_users: stats.total_users,
        }
    }
}

/// Reconciliation aggregates for the admin dashboard. Read-only.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.store.get_stats()?;
    Ok(Json(StatsResponse::from(stats)))
}

/// Adjustment request body.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    /// User to adjust.
    pub user_id: String,
    /// Signed coin delta; negative debits the balance.
    pub coins: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
}

/// Adjustment response.
#[derive(Debug, Serialize)]
pub struct AdjustmentResponse {
    /// The settled adjustment transaction.
    pub transaction: TransactionResponse,
    /// Balance after the adjustment.
    pub new_balance: i64,
}

/// Apply a manual balance correction. Settles immediately as `processed`.
pub async fn apply_adjustment(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<AdjustmentRequest>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let user_id = body
        .user_id
        .parse::<UserId>()
        .map_err(|_| ApiError::BadRequest("invalid user_id".into()))?;

    if body.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("a reason is required".into()));
    }

    let (transaction, new_balance) =
        state
            .store
            .apply_adjustment(&user_id, body.coins, body.reason)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        coins = %body.coins,
        new_balance = %new_balance,
        "Adjustment applied"
    );

    Ok(Json(AdjustmentResponse {
        transaction: TransactionResponse::from(&transaction),
        new_balance,
    }))
}

/// Purge response.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    /// Rows removed.
    pub purged: usize,
}

/// Delete expired and claimed staging rows now.
///
/// The background task does this on an interval; this endpoint exists for
/// operational use.
pub async fn purge_receipts(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<PurgeResponse>, ApiError> {
    let purged = state.store.purge_expired(Utc::now())?;

    tracing::info!(admin_id = %admin.admin_id, purged = %purged, "Staging rows purged");

    Ok(Json(PurgeResponse { purged }))
}
