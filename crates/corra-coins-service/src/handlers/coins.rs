//! Coin balance, history and redemption handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use corra_coins_core::{
    validate_bill_amount, BrandId, BrandRates, TransactionStatus, TransactionType,
};
use corra_coins_store::{Store, TransactionFilter};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::state::AppState;

/// Default page size for transaction listings.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum page size for transaction listings.
const MAX_PAGE_SIZE: usize = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// User ID.
    pub user_id: String,
    /// Current spendable balance.
    pub balance: i64,
    /// Lifetime coins earned.
    pub total_earned: i64,
    /// Lifetime coins redeemed.
    pub total_redeemed: i64,
}

/// Get the current user's coin balance.
///
/// A user without a ledger account reads as a zero balance rather than 404;
/// the account materializes on registration.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state.store.get_account(&auth.user_id)?;

    let response = account.map_or_else(
        || BalanceResponse {
            user_id: auth.user_id.to_string(),
            balance: 0,
            total_earned: 0,
            total_redeemed: 0,
        },
        |a| BalanceResponse {
            user_id: a.user_id.to_string(),
            balance: a.balance,
            total_earned: a.total_earned,
            total_redeemed: a.total_redeemed,
        },
    );

    Ok(Json(response))
}

/// Query parameters for transaction listing.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by status (e.g. `pending`).
    pub status: Option<String>,
    /// Filter by type (e.g. `earn`).
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Page size (default 50, max 200).
    pub limit: Option<usize>,
    /// Pagination offset.
    pub offset: Option<usize>,
}

/// Transaction list response.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Page size used.
    pub limit: usize,
    /// Offset used.
    pub offset: usize,
}

/// Parse optional status / type query strings into a filter.
fn parse_filter(
    status: Option<&str>,
    transaction_type: Option<&str>,
) -> Result<(Option<TransactionStatus>, Option<TransactionType>), ApiError> {
    let status = status
        .map(str::parse::<TransactionStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let transaction_type = transaction_type
        .map(str::parse::<TransactionType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    Ok((status, transaction_type))
}

/// List the current user's transactions, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let (status, transaction_type) =
        parse_filter(query.status.as_deref(), query.transaction_type.as_deref())?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let filter = TransactionFilter {
        user_id: Some(auth.user_id),
        status,
        transaction_type,
        brand_id: None,
    };

    let transactions = state.store.list_transactions(&filter, limit, offset)?;

    Ok(Json(TransactionListResponse {
        transactions: transactions.iter().map(TransactionResponse::from).collect(),
        limit,
        offset,
    }))
}

/// Redemption request.
///
/// The caller supplies the brand's redemption rules alongside the amount;
/// brand catalog data lives in a separate service and is passed through
/// here at request time.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// Brand the redemption applies to.
    pub brand_id: String,
    /// Bill amount the coins are redeemed against.
    pub bill_amount: i64,
    /// Coins to redeem.
    pub coins: i64,
    /// Brand redemption rules in effect.
    pub brand_rates: BrandRates,
}

/// Create a pending redemption request.
///
/// The balance is checked now for early feedback, but coins move only when
/// an admin approves; the authoritative check happens again at approval
/// under the write lock.
pub async fn redeem_coins(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    validate_bill_amount(body.bill_amount)?;

    let brand_id = body
        .brand_id
        .parse::<BrandId>()
        .map_err(|_| ApiError::BadRequest("invalid brand_id".into()))?;

    body.brand_rates
        .validate_redemption(body.coins, body.bill_amount)?;

    // Early balance check; not authoritative
    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;
    if !account.has_sufficient_balance(body.coins) {
        return Err(ApiError::InsufficientBalance {
            balance: account.balance,
            required: body.coins,
        });
    }

    let transaction =
        state
            .store
            .create_redeem_request(&auth.user_id, brand_id, body.bill_amount, body.coins)?;

    tracing::info!(
        user_id = %auth.user_id,
        transaction_id = %transaction.id,
        coins = %body.coins,
        brand_id = %brand_id,
        "Redemption requested"
    );

    Ok(Json(TransactionResponse::from(&transaction)))
}
