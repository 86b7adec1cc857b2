//! Error types for coin ledger storage.

use corra_coins_core::transaction::TransactionStatus;
use corra_coins_core::CoinError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// Insufficient balance for a redemption.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current spendable balance.
        balance: i64,
        /// Coins required by the redemption.
        required: i64,
    },

    /// A status transition was attempted from a terminal or mismatched
    /// state. The transaction is unchanged.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// The transaction's current status.
        from: TransactionStatus,
        /// The requested status.
        to: TransactionStatus,
    },

    /// Staged receipt is past its expiry.
    #[error("receipt expired: {receipt_id}")]
    ReceiptExpired {
        /// The expired receipt id.
        receipt_id: String,
    },

    /// Staged receipt was already claimed.
    #[error("receipt already claimed: {receipt_id}")]
    ReceiptAlreadyClaimed {
        /// The claimed receipt id.
        receipt_id: String,
    },

    /// The user already received their welcome bonus.
    #[error("welcome bonus already granted: {user_id}")]
    DuplicateWelcomeBonus {
        /// The user in question.
        user_id: String,
    },

    /// Writer lock contention or poisoning. Safe to retry with backoff.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Invalid coin or bill amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<CoinError> for StoreError {
    fn from(err: CoinError) -> Self {
        match err {
            CoinError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            CoinError::InvalidStateTransition { from, to } => {
                Self::InvalidTransition { from, to }
            }
            CoinError::AccountNotFound { user_id } => Self::NotFound {
                entity: "account",
                id: user_id,
            },
            CoinError::TransactionNotFound { transaction_id } => Self::NotFound {
                entity: "transaction",
                id: transaction_id,
            },
            CoinError::ReceiptNotFound { receipt_id } => Self::NotFound {
                entity: "receipt",
                id: receipt_id,
            },
            CoinError::ReceiptExpired { receipt_id } => Self::ReceiptExpired { receipt_id },
            CoinError::ReceiptAlreadyClaimed { receipt_id } => {
                Self::ReceiptAlreadyClaimed { receipt_id }
            }
            CoinError::ConcurrencyConflict(msg) => Self::ConcurrencyConflict(msg),
            CoinError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            CoinError::InvalidId(e) => Self::InvalidAmount(e.to_string()),
        }
    }
}
