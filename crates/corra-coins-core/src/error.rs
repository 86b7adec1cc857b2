//! Error types for the coin ledger.

use crate::ids::IdError;
use crate::transaction::TransactionStatus;

/// Result type for coin ledger operations.
pub type Result<T> = std::result::Result<T, CoinError>;

/// Errors that can occur in coin ledger operations.
///
/// Nothing here is fatal to the process: every failure is per-request and
/// recoverable by caller action (retry, admin review, or user correction).
#[derive(Debug, thiserror::Error)]
pub enum CoinError {
    /// Redemption exceeds the available balance. Reported to the caller,
    /// never retried automatically.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current spendable balance.
        balance: i64,
        /// Coins required by the redemption.
        required: i64,
    },

    /// A transition was attempted from a terminal or mismatched status.
    /// The transaction is left unchanged.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// The transaction's current status.
        from: TransactionStatus,
        /// The requested status.
        to: TransactionStatus,
    },

    /// Ledger account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Coin transaction not found.
    #[error("transaction not found: {transaction_id}")]
    TransactionNotFound {
        /// The transaction ID that was not found.
        transaction_id: String,
    },

    /// Staged receipt not found.
    #[error("receipt not found: {receipt_id}")]
    ReceiptNotFound {
        /// The receipt ID that was not found.
        receipt_id: String,
    },

    /// Staged receipt is past its expiry and can no longer be claimed.
    /// Reported distinctly from [`CoinError::ReceiptAlreadyClaimed`] so the
    /// client can explain to the end user why the receipt is gone.
    #[error("receipt expired: {receipt_id}")]
    ReceiptExpired {
        /// The expired receipt ID.
        receipt_id: String,
    },

    /// Staged receipt was already claimed by a user.
    #[error("receipt already claimed: {receipt_id}")]
    ReceiptAlreadyClaimed {
        /// The claimed receipt ID.
        receipt_id: String,
    },

    /// Lock contention on the ledger. Safe to retry with backoff.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Invalid coin or bill amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
