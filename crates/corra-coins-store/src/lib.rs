//! `RocksDB` storage layer for the Club Corra coin ledger.
//!
//! This crate provides persistent storage for ledger accounts, coin
//! transactions, and staged receipts using `RocksDB` with column families
//! for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: Ledger accounts, keyed by `user_id`
//! - `transactions`: Coin transactions, keyed by `transaction_id` (ULID)
//! - `transactions_by_user`: Index for listing transactions by user
//! - `staged_receipts`: Anonymous uploads awaiting claim, keyed by ULID
//!
//! # Atomicity
//!
//! Every verification-workflow transition is a compound operation: the
//! status write and its ledger mutation land in one `WriteBatch`, prepared
//! while holding a store-wide writer lock. Partial application (balance
//! changed but status not, or vice versa) is the primary failure mode this
//! layer exists to prevent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use corra_coins_core::{
    BrandId, CoinTransaction, LedgerAccount, ReceiptId, StagedReceipt, TransactionId,
    TransactionStatus, TransactionType, UserId,
};

/// Outcome of an approval request.
///
/// Re-approving an already-approved transaction is an idempotent no-op, so
/// of two concurrent approvals exactly one observes `Applied` and the ledger
/// is mutated once.
#[derive(Debug, Clone)]
pub enum Approval {
    /// The transition was applied and the ledger mutated.
    Applied {
        /// The transaction after the transition.
        transaction: CoinTransaction,
        /// The ledger balance after the mutation.
        new_balance: i64,
    },

    /// The transaction was already approved; nothing changed.
    AlreadyApproved {
        /// The transaction as stored.
        transaction: CoinTransaction,
    },
}

impl Approval {
    /// The transaction record, whichever branch was taken.
    #[must_use]
    pub fn transaction(&self) -> &CoinTransaction {
        match self {
            Self::Applied { transaction, .. } | Self::AlreadyApproved { transaction } => {
                transaction
            }
        }
    }

    /// Whether the ledger was mutated by this call.
    #[must_use]
    pub const fn was_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Outcome of a rejection request.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// Rejected from `Pending`; the ledger was never touched.
    Rejected {
        /// The transaction after the transition.
        transaction: CoinTransaction,
    },

    /// Rejected from `Approved`; the ledger mutation was reverted using the
    /// stored snapshot.
    Reversed {
        /// The transaction after the transition.
        transaction: CoinTransaction,
        /// The ledger balance after the reversal.
        new_balance: i64,
    },

    /// The transaction was already rejected; nothing changed.
    AlreadyRejected {
        /// The transaction as stored.
        transaction: CoinTransaction,
    },
}

impl Rejection {
    /// The transaction record, whichever branch was taken.
    #[must_use]
    pub fn transaction(&self) -> &CoinTransaction {
        match self {
            Self::Rejected { transaction }
            | Self::Reversed { transaction, .. }
            | Self::AlreadyRejected { transaction } => transaction,
        }
    }
}

/// Filters for listing transactions. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one user.
    pub user_id: Option<UserId>,

    /// Restrict to one status.
    pub status: Option<TransactionStatus>,

    /// Restrict to one transaction type.
    pub transaction_type: Option<TransactionType>,

    /// Restrict to one brand.
    pub brand_id: Option<BrandId>,
}

impl TransactionFilter {
    /// Check whether a transaction passes every set filter.
    #[must_use]
    pub fn matches(&self, tx: &CoinTransaction) -> bool {
        self.user_id.map_or(true, |u| tx.user_id == u)
            && self.status.map_or(true, |s| tx.status == s)
            && self
                .transaction_type
                .map_or(true, |t| tx.transaction_type == t)
            && self.brand_id.map_or(true, |b| tx.brand_id == Some(b))
    }
}

/// Read-side aggregates for dashboards. Computing these never mutates the
/// ledger or any transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinStats {
    /// Sum of all spendable balances.
    pub total_coins_in_circulation: i64,

    /// Number of welcome bonuses granted.
    pub welcome_bonuses_given: u64,

    /// Coins locked in pending redemption requests.
    pub pending_redemptions: i64,

    /// Number of earn requests awaiting review.
    pub pending_earn_requests: u64,

    /// Number of ledger accounts.
    pub total_users: u64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update a ledger account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &LedgerAccount) -> Result<()>;

    /// Get a ledger account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<LedgerAccount>>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CoinTransaction>>;

    /// List transactions matching a filter, newest first.
    ///
    /// With a user filter this walks the per-user index; otherwise it scans
    /// the transaction column family.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CoinTransaction>>;

    // =========================================================================
    // Staging Operations
    // =========================================================================

    /// Persist a newly staged receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn stage_receipt(&self, receipt: &StagedReceipt) -> Result<()>;

    /// Get a staged receipt by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_receipt(&self, receipt_id: &ReceiptId) -> Result<Option<StagedReceipt>>;

    /// Delete expired and already-claimed staging rows, returning the count.
    ///
    /// Best-effort housekeeping: claim-time expiry checks are the
    /// correctness guard, this only reclaims storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Compound Operations (status write + ledger mutation, atomic)
    // =========================================================================

    /// Claim a staged receipt for an authenticated user.
    ///
    /// Marks the receipt claimed and creates a `Pending` EARN transaction
    /// whose `previous_balance` is the ledger balance read at claim time,
    /// in one atomic batch. Creates the user's account if absent.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the receipt doesn't exist.
    /// - `ReceiptAlreadyClaimed` / `ReceiptExpired` per claim eligibility.
    fn claim_receipt(
        &self,
        receipt_id: &ReceiptId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<CoinTransaction>;

    /// Create a `Pending` REDEEM transaction for a user.
    ///
    /// Soft-checks the balance so hopeless requests fail early; the binding
    /// check happens again at approval.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account doesn't exist.
    /// - `InsufficientBalance` if the balance can't cover the request.
    fn create_redeem_request(
        &self,
        user_id: &UserId,
        brand_id: BrandId,
        bill_amount: i64,
        coins: i64,
    ) -> Result<CoinTransaction>;

    /// Approve a pending transaction, applying its ledger mutation.
    ///
    /// EARN applies the credit and stamps `balance_after_earn`; REDEEM
    /// applies the debit (or fails, leaving the transaction `Pending`) and
    /// stamps `balance_after_redeem`. `previous_balance` is re-stamped from
    /// the balance read under the writer lock immediately before mutation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the transaction or account doesn't exist.
    /// - `InsufficientBalance` for an uncovered redeem; nothing is written.
    /// - `InvalidTransition` from any status other than `Pending` or
    ///   `Approved` (the latter is the idempotent no-op).
    fn approve_transaction(
        &self,
        transaction_id: &TransactionId,
        admin_notes: Option<String>,
    ) -> Result<Approval>;

    /// Reject a transaction.
    ///
    /// From `Pending` this is a status-only transition. From `Approved` it
    /// reverts the ledger to the stored `previous_balance` snapshot, never a
    /// recomputed delta. Rejecting an already-rejected transaction is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the transaction or account doesn't exist.
    /// - `InvalidTransition` from `Processed`, `Paid`, `Unpaid`, `Failed`.
    fn reject_transaction(&self, transaction_id: &TransactionId, note: String)
        -> Result<Rejection>;

    /// Record the payout result for an approved transaction.
    ///
    /// Success drives `Approved`/`Processed` to `Paid`; failure drives
    /// `Approved` to `Unpaid` and `Processed` to `Failed`. The coin ledger
    /// is never touched: coin movement and fiat payout are decoupled.
    /// Re-delivery for an already-settled transaction is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the transaction doesn't exist.
    /// - `InvalidTransition` if the transaction was never approved.
    fn record_payment_result(
        &self,
        transaction_id: &TransactionId,
        success: bool,
    ) -> Result<CoinTransaction>;

    /// Grant the one-time welcome bonus, creating the account if absent.
    ///
    /// Returns the settled transaction and the new balance.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateWelcomeBonus` if the user already received one.
    fn grant_welcome_bonus(&self, user_id: &UserId, coins: i64)
        -> Result<(CoinTransaction, i64)>;

    /// Apply a programmatic adjustment, positive or negative.
    ///
    /// Returns the settled transaction and the new balance.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account doesn't exist.
    /// - `InsufficientBalance` if a negative adjustment overdraws.
    fn apply_adjustment(
        &self,
        user_id: &UserId,
        coins: i64,
        reason: String,
    ) -> Result<(CoinTransaction, i64)>;

    // =========================================================================
    // Reconciliation Queries (read-only)
    // =========================================================================

    /// Compute dashboard aggregates. Never mutates anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_stats(&self) -> Result<CoinStats>;
}
