//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The transaction is in a status that does not admit the requested
    /// transition. Nothing was changed.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Staged receipt was already claimed by a user.
    #[error("receipt already claimed: {0}")]
    AlreadyClaimed(String),

    /// Staged receipt is past its expiry.
    #[error("receipt expired: {0}")]
    ReceiptExpired(String),

    /// Insufficient coin balance for a redemption.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current spendable balance.
        balance: i64,
        /// Coins required.
        required: i64,
    },

    /// Ledger lock contention - safe to retry with backoff.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                "invalid_state_transition",
                msg.clone(),
                None,
            ),
            Self::AlreadyClaimed(id) => (
                StatusCode::CONFLICT,
                "receipt_already_claimed",
                format!("Receipt {id} was already claimed"),
                None,
            ),
            Self::ReceiptExpired(id) => (
                StatusCode::GONE,
                "receipt_expired",
                format!("Receipt {id} has expired"),
                None,
            ),
            Self::InsufficientBalance { balance, required } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::ConcurrencyConflict(msg) => (
                StatusCode::CONFLICT,
                "concurrency_conflict",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<corra_coins_store::StoreError> for ApiError {
    fn from(err: corra_coins_store::StoreError) -> Self {
        use corra_coins_store::StoreError;
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            StoreError::InvalidTransition { from, to } => Self::InvalidStateTransition(format!(
                "cannot move transaction from {from:?} to {to:?}"
            )),
            StoreError::ReceiptExpired { receipt_id } => Self::ReceiptExpired(receipt_id),
            StoreError::ReceiptAlreadyClaimed { receipt_id } => Self::AlreadyClaimed(receipt_id),
            StoreError::DuplicateWelcomeBonus { user_id } => {
                Self::Conflict(format!("Account already registered: {user_id}"))
            }
            StoreError::ConcurrencyConflict(msg) => Self::ConcurrencyConflict(msg),
            StoreError::InvalidAmount(msg) => Self::BadRequest(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<corra_coins_core::CoinError> for ApiError {
    fn from(err: corra_coins_core::CoinError) -> Self {
        use corra_coins_core::CoinError;
        match err {
            CoinError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            CoinError::InvalidAmount(msg) => Self::BadRequest(msg),
            other => Self::BadRequest(other.to_string()),
        }
    }
}
