//! Ledger account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use corra_coins_core::LedgerAccount;
use corra_coins_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::state::AppState;

/// Ledger account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current spendable balance.
    pub balance: i64,
    /// Lifetime coins earned.
    pub total_earned: i64,
    /// Lifetime coins redeemed.
    pub total_redeemed: i64,
    /// Created timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<&LedgerAccount> for AccountResponse {
    fn from(account: &LedgerAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            total_earned: account.total_earned,
            total_redeemed: account.total_redeemed,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Response for account registration: the created account plus the settled
/// welcome bonus transaction.
#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    /// The new ledger account.
    pub account: AccountResponse,
    /// The welcome bonus transaction, already `processed`.
    pub welcome_bonus: TransactionResponse,
}

/// Register the authenticated user's ledger account.
///
/// Creates the account and grants the one-time welcome bonus in the same
/// write. Calling this twice returns 409.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CreateAccountResponse>, ApiError> {
    let (transaction, _new_balance) = state
        .store
        .grant_welcome_bonus(&auth.user_id, state.config.welcome_bonus_coins)?;

    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::Internal("account missing after welcome bonus".into()))?;

    tracing::info!(
        user_id = %auth.user_id,
        coins = %transaction.coins_earned,
        "Account created with welcome bonus"
    );

    Ok(Json(CreateAccountResponse {
        account: AccountResponse::from(&account),
        welcome_bonus: TransactionResponse::from(&transaction),
    }))
}

/// Get the current user's ledger account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}
