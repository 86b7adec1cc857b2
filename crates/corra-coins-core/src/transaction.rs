//! Coin transaction types and the verification state machine.
//!
//! A [`CoinTransaction`] is the immutable-once-finalized record of a single
//! earn or redeem event. Rows are never deleted, only status-transitioned,
//! which preserves the audit trail. The legal transitions are encoded in
//! [`TransactionStatus::can_transition_to`], which is authoritative for the
//! whole workspace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoinError, Result};
use crate::{BrandId, TransactionId, UserId};

/// A single earn or redeem event in a user's coin history.
///
/// The `previous_balance` / `balance_after_earn` / `balance_after_redeem`
/// fields are stored snapshots taken at the moment the ledger mutation is
/// applied. They exist so that a REJECTED-after-APPROVED reversal is exact
/// and replay-safe: recomputing "current balance minus coins" at reversal
/// time would be wrong if other transactions interleaved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose ledger this transaction affects.
    pub user_id: UserId,

    /// The brand the bill was incurred at, if any. Welcome bonuses and
    /// adjustments carry no brand.
    pub brand_id: Option<BrandId>,

    /// What kind of event this is.
    pub transaction_type: TransactionType,

    /// Where the transaction sits in the verification workflow.
    pub status: TransactionStatus,

    /// Bill amount in whole currency units. Zero for bonuses/adjustments.
    pub bill_amount: i64,

    /// Coins credited by this transaction. Zero for redeems.
    pub coins_earned: i64,

    /// Coins debited by this transaction. Zero for earns.
    pub coins_redeemed: i64,

    /// Ledger balance immediately before this transaction's mutation was
    /// applied. Stamped at claim time and re-stamped at approval, used
    /// exclusively to compute exact reversal on rejection.
    pub previous_balance: i64,

    /// Ledger balance right after the earn was applied, if applicable.
    pub balance_after_earn: Option<i64>,

    /// Ledger balance right after the redeem was applied, if applicable.
    pub balance_after_redeem: Option<i64>,

    /// URL of the uploaded receipt image, if any.
    pub receipt_url: Option<String>,

    /// Date printed on the bill.
    pub bill_date: Option<NaiveDate>,

    /// Notes recorded by the reviewing admin. Required on rejection.
    pub admin_notes: Option<String>,

    /// When the payout moved to PROCESSED.
    pub processed_at: Option<DateTime<Utc>>,

    /// When the payout settled (PAID).
    pub payment_processed_at: Option<DateTime<Utc>>,

    /// When the status last changed.
    pub status_updated_at: DateTime<Utc>,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CoinTransaction {
    /// Create a pending EARN transaction from a claimed receipt.
    ///
    /// `previous_balance` is the ledger balance read at claim time.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn earn(
        user_id: UserId,
        brand_id: BrandId,
        bill_amount: i64,
        coins_earned: i64,
        previous_balance: i64,
        receipt_url: Option<String>,
        bill_date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            brand_id: Some(brand_id),
            transaction_type: TransactionType::Earn,
            status: TransactionStatus::Pending,
            bill_amount,
            coins_earned,
            coins_redeemed: 0,
            previous_balance,
            balance_after_earn: None,
            balance_after_redeem: None,
            receipt_url,
            bill_date,
            admin_notes: None,
            processed_at: None,
            payment_processed_at: None,
            status_updated_at: now,
            created_at: now,
        }
    }

    /// Create a pending REDEEM transaction.
    ///
    /// No ledger mutation happens until an admin approves it.
    #[must_use]
    pub fn redeem(
        user_id: UserId,
        brand_id: BrandId,
        bill_amount: i64,
        coins_redeemed: i64,
        previous_balance: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            brand_id: Some(brand_id),
            transaction_type: TransactionType::Redeem,
            status: TransactionStatus::Pending,
            bill_amount,
            coins_earned: 0,
            coins_redeemed,
            previous_balance,
            balance_after_earn: None,
            balance_after_redeem: None,
            receipt_url: None,
            bill_date: None,
            admin_notes: None,
            processed_at: None,
            payment_processed_at: None,
            status_updated_at: now,
            created_at: now,
        }
    }

    /// Create a welcome-bonus transaction, settled immediately.
    ///
    /// Welcome bonuses skip admin review: the credit is applied at creation
    /// time, so the record is born `Processed` with its snapshots stamped.
    #[must_use]
    pub fn welcome_bonus(user_id: UserId, coins: i64, previous_balance: i64) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            brand_id: None,
            transaction_type: TransactionType::WelcomeBonus,
            status: TransactionStatus::Processed,
            bill_amount: 0,
            coins_earned: coins,
            coins_redeemed: 0,
            previous_balance,
            balance_after_earn: Some(previous_balance + coins),
            balance_after_redeem: None,
            receipt_url: None,
            bill_date: None,
            admin_notes: None,
            processed_at: Some(now),
            payment_processed_at: None,
            status_updated_at: now,
            created_at: now,
        }
    }

    /// Create a programmatic adjustment transaction, applied immediately.
    ///
    /// Positive `coins` credit the ledger, negative coins debit it. The
    /// reason is recorded in `admin_notes`.
    #[must_use]
    pub fn adjustment(user_id: UserId, coins: i64, previous_balance: i64, reason: String) -> Self {
        let now = Utc::now();
        let (earned, redeemed) = if coins >= 0 { (coins, 0) } else { (0, -coins) };
        Self {
            id: TransactionId::generate(),
            user_id,
            brand_id: None,
            transaction_type: TransactionType::Adjustment,
            status: TransactionStatus::Processed,
            bill_amount: 0,
            coins_earned: earned,
            coins_redeemed: redeemed,
            previous_balance,
            balance_after_earn: (earned > 0).then(|| previous_balance + earned),
            balance_after_redeem: (redeemed > 0).then(|| previous_balance - redeemed),
            receipt_url: None,
            bill_date: None,
            admin_notes: Some(reason),
            processed_at: Some(now),
            payment_processed_at: None,
            status_updated_at: now,
            created_at: now,
        }
    }

    /// The signed effect of this transaction on the balance, once applied.
    #[must_use]
    pub const fn coin_delta(&self) -> i64 {
        self.coins_earned - self.coins_redeemed
    }

    /// Move to a new status, stamping `status_updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the move is not legal; the
    /// transaction is left unchanged.
    pub fn transition_to(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoinError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.status_updated_at = Utc::now();
        Ok(())
    }
}

/// What kind of event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Coins earned from a verified receipt.
    Earn,

    /// Coins redeemed against a bill.
    Redeem,

    /// One-time signup bonus.
    WelcomeBonus,

    /// Programmatic correction, positive or negative.
    Adjustment,
}

impl TransactionType {
    /// Check whether this type credits the ledger.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Earn | Self::WelcomeBonus)
    }

    /// Check whether this type debits the ledger.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Redeem)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Earn => "earn",
            Self::Redeem => "redeem",
            Self::WelcomeBonus => "welcome_bonus",
            Self::Adjustment => "adjustment",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "earn" => Ok(Self::Earn),
            "redeem" => Ok(Self::Redeem),
            "welcome_bonus" => Ok(Self::WelcomeBonus),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Where a transaction sits in the verification workflow.
///
/// Happy path: `Pending -> Approved -> Processed -> Paid`. Rejection is
/// reachable from `Pending` (status-only) and from `Approved` (reversal
/// using the stored snapshot). `Unpaid` and `Failed` record downstream
/// payout failures and never touch the coin ledger; `Unpaid` alone can
/// still settle to `Paid` on a successful payout retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting admin review. The ledger has not been touched.
    Pending,

    /// Admin approved; the ledger mutation has been applied.
    Approved,

    /// Admin rejected. Terminal.
    Rejected,

    /// Payout accepted by the payment provider.
    Processed,

    /// Payout settled. Terminal.
    Paid,

    /// Payout failed before processing. The coin movement stands. A later
    /// successful payout retry settles this to `Paid`.
    Unpaid,

    /// Payout failed after processing. The coin movement stands. Terminal.
    Failed,
}

impl TransactionStatus {
    /// Check whether this status admits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Paid | Self::Failed)
    }

    /// Check whether a transition to `next` is legal.
    ///
    /// This table is authoritative; every status write in the workspace goes
    /// through it.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
                | (
                    Self::Approved,
                    Self::Processed | Self::Paid | Self::Rejected | Self::Unpaid
                )
                | (Self::Processed, Self::Paid | Self::Failed)
                | (Self::Unpaid, Self::Paid)
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Processed => "processed",
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "processed" => Ok(Self::Processed),
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_earn() -> CoinTransaction {
        CoinTransaction::earn(
            UserId::generate(),
            BrandId::generate(),
            500,
            50,
            0,
            Some("https://cdn.example.com/r/1.jpg".into()),
            None,
        )
    }

    #[test]
    fn earn_starts_pending_with_no_stamps() {
        let tx = pending_earn();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.coins_earned, 50);
        assert_eq!(tx.coins_redeemed, 0);
        assert!(tx.balance_after_earn.is_none());
        assert_eq!(tx.coin_delta(), 50);
    }

    #[test]
    fn redeem_is_mutually_exclusive_with_earn() {
        let tx = CoinTransaction::redeem(UserId::generate(), BrandId::generate(), 200, 30, 100);
        assert_eq!(tx.coins_earned, 0);
        assert_eq!(tx.coins_redeemed, 30);
        assert_eq!(tx.coin_delta(), -30);
    }

    #[test]
    fn welcome_bonus_is_born_processed() {
        let tx = CoinTransaction::welcome_bonus(UserId::generate(), 100, 0);
        assert_eq!(tx.status, TransactionStatus::Processed);
        assert_eq!(tx.balance_after_earn, Some(100));
        assert!(tx.processed_at.is_some());
    }

    #[test]
    fn negative_adjustment_records_redeem_side() {
        let tx = CoinTransaction::adjustment(UserId::generate(), -25, 80, "correction".into());
        assert_eq!(tx.coins_redeemed, 25);
        assert_eq!(tx.balance_after_redeem, Some(55));
        assert_eq!(tx.coin_delta(), -25);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use TransactionStatus as S;
        assert!(S::Pending.can_transition_to(S::Approved));
        assert!(S::Approved.can_transition_to(S::Processed));
        assert!(S::Processed.can_transition_to(S::Paid));
    }

    #[test]
    fn rejection_paths_are_legal() {
        use TransactionStatus as S;
        assert!(S::Pending.can_transition_to(S::Rejected));
        // Reversal of an already-applied mutation.
        assert!(S::Approved.can_transition_to(S::Rejected));
    }

    #[test]
    fn payout_failure_paths_are_legal() {
        use TransactionStatus as S;
        assert!(S::Approved.can_transition_to(S::Unpaid));
        assert!(S::Processed.can_transition_to(S::Failed));
    }

    #[test]
    fn unpaid_settles_only_through_paid() {
        use TransactionStatus as S;
        assert!(!S::Unpaid.is_terminal());
        assert!(S::Unpaid.can_transition_to(S::Paid));
        for next in [S::Pending, S::Approved, S::Rejected, S::Processed, S::Failed] {
            assert!(!S::Unpaid.can_transition_to(next));
        }
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use TransactionStatus as S;
        for terminal in [S::Rejected, S::Paid, S::Failed] {
            assert!(terminal.is_terminal());
            for next in [
                S::Pending,
                S::Approved,
                S::Rejected,
                S::Processed,
                S::Paid,
                S::Unpaid,
                S::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn approving_rejected_transaction_fails_unchanged() {
        let mut tx = pending_earn();
        tx.transition_to(TransactionStatus::Rejected).unwrap();

        let err = tx.transition_to(TransactionStatus::Approved).unwrap_err();
        assert!(matches!(
            err,
            CoinError::InvalidStateTransition {
                from: TransactionStatus::Rejected,
                to: TransactionStatus::Approved,
            }
        ));
        assert_eq!(tx.status, TransactionStatus::Rejected);
    }

    #[test]
    fn pending_cannot_skip_to_paid() {
        let mut tx = pending_earn();
        assert!(tx.transition_to(TransactionStatus::Paid).is_err());
        assert_eq!(tx.status, TransactionStatus::Pending);
    }
}
