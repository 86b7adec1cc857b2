//! Ledger account types for the coin ledger.
//!
//! This module defines the per-user running balance and lifetime counters,
//! together with the three mutations the verification workflow is allowed to
//! perform on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoinError, Result};
use crate::UserId;

/// Default number of coins granted as a welcome bonus on registration.
pub const DEFAULT_WELCOME_BONUS_COINS: i64 = 100;

/// A per-user ledger account.
///
/// Tracks the current spendable balance and the lifetime earn/redeem
/// counters. The ledger invariant is `balance == total_earned -
/// total_redeemed` after every committed mutation, and `balance` never goes
/// negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// The owning user.
    pub user_id: UserId,

    /// Current spendable coins. Never negative.
    pub balance: i64,

    /// Lifetime coins earned. Decreases only when a reversal cancels the
    /// earn that raised it.
    pub total_earned: i64,

    /// Lifetime coins redeemed. Decreases only when a reversal cancels the
    /// redeem that raised it.
    pub total_redeemed: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl LedgerAccount {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: 0,
            total_earned: 0,
            total_redeemed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account can cover a redemption.
    #[must_use]
    pub fn has_sufficient_balance(&self, coins: i64) -> bool {
        self.balance >= coins
    }

    /// Credit coins unconditionally (monotonic credit).
    ///
    /// Increments `balance` and `total_earned` and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `coins` is zero or negative.
    pub fn apply_earn(&mut self, coins: i64) -> Result<i64> {
        validate_positive(coins)?;
        self.balance += coins;
        self.total_earned += coins;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Debit coins, failing if the balance cannot cover them.
    ///
    /// Decrements `balance` and increments `total_redeemed`, returning the
    /// new balance. On failure nothing is mutated.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `coins` is zero or negative.
    /// - `InsufficientBalance` if `coins > balance`.
    pub fn apply_redeem(&mut self, coins: i64) -> Result<i64> {
        validate_positive(coins)?;
        if coins > self.balance {
            return Err(CoinError::InsufficientBalance {
                balance: self.balance,
                required: coins,
            });
        }
        self.balance -= coins;
        self.total_redeemed += coins;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Undo a previously applied earn using its stored snapshot.
    ///
    /// Restores `balance` to `snapshot` and rolls `total_earned` back by the
    /// transaction's coin amount, so [`Self::is_consistent`] holds after the
    /// reversal. Used only by rejection handling; idempotence is enforced one
    /// level up via the transaction status.
    pub fn revert_earn(&mut self, snapshot: i64, coins: i64) {
        self.balance = snapshot;
        self.total_earned -= coins;
        self.updated_at = Utc::now();
    }

    /// Undo a previously applied redeem using its stored snapshot.
    ///
    /// Restores `balance` to `snapshot` and rolls `total_redeemed` back by
    /// the transaction's coin amount.
    pub fn revert_redeem(&mut self, snapshot: i64, coins: i64) {
        self.balance = snapshot;
        self.total_redeemed -= coins;
        self.updated_at = Utc::now();
    }

    /// Check the ledger invariant: `balance == total_earned - total_redeemed`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_earned - self.total_redeemed
    }
}

/// Reject zero or negative coin amounts at the operation boundary.
fn validate_positive(coins: i64) -> Result<()> {
    if coins <= 0 {
        return Err(CoinError::InvalidAmount(format!(
            "coin amount must be positive, got {coins}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_zero_balance() {
        let account = LedgerAccount::new(UserId::generate());
        assert_eq!(account.balance, 0);
        assert_eq!(account.total_earned, 0);
        assert_eq!(account.total_redeemed, 0);
        assert!(account.is_consistent());
    }

    #[test]
    fn apply_earn_credits_balance_and_counter() {
        let mut account = LedgerAccount::new(UserId::generate());
        let new_balance = account.apply_earn(50).unwrap();
        assert_eq!(new_balance, 50);
        assert_eq!(account.balance, 50);
        assert_eq!(account.total_earned, 50);
        assert!(account.is_consistent());
    }

    #[test]
    fn apply_redeem_debits_balance_and_counter() {
        let mut account = LedgerAccount::new(UserId::generate());
        account.apply_earn(100).unwrap();
        let new_balance = account.apply_redeem(30).unwrap();
        assert_eq!(new_balance, 70);
        assert_eq!(account.total_redeemed, 30);
        assert!(account.is_consistent());
    }

    #[test]
    fn apply_redeem_beyond_balance_fails_without_mutation() {
        let mut account = LedgerAccount::new(UserId::generate());
        account.apply_earn(50).unwrap();

        let err = account.apply_redeem(80).unwrap_err();
        assert!(matches!(
            err,
            CoinError::InsufficientBalance {
                balance: 50,
                required: 80
            }
        ));
        assert_eq!(account.balance, 50);
        assert_eq!(account.total_redeemed, 0);
        assert!(account.is_consistent());
    }

    #[test]
    fn zero_and_negative_amounts_rejected() {
        let mut account = LedgerAccount::new(UserId::generate());
        assert!(matches!(
            account.apply_earn(0),
            Err(CoinError::InvalidAmount(_))
        ));
        assert!(matches!(
            account.apply_redeem(-5),
            Err(CoinError::InvalidAmount(_))
        ));
    }

    #[test]
    fn revert_earn_restores_snapshot_and_counter() {
        let mut account = LedgerAccount::new(UserId::generate());
        let snapshot = account.balance;
        account.apply_earn(50).unwrap();

        account.revert_earn(snapshot, 50);
        assert_eq!(account.balance, 0);
        assert_eq!(account.total_earned, 0);
        assert!(account.is_consistent());
    }

    #[test]
    fn revert_redeem_restores_snapshot_and_counter() {
        let mut account = LedgerAccount::new(UserId::generate());
        account.apply_earn(100).unwrap();
        let snapshot = account.balance;
        account.apply_redeem(40).unwrap();

        account.revert_redeem(snapshot, 40);
        assert_eq!(account.balance, 100);
        assert_eq!(account.total_redeemed, 0);
        assert!(account.is_consistent());
    }

    #[test]
    fn revert_uses_stored_snapshot_not_recomputed_delta() {
        // The reversal restores the snapshot taken immediately before its
        // own mutation rather than recomputing balance minus coins.
        let mut account = LedgerAccount::new(UserId::generate());
        account.apply_earn(100).unwrap();

        let snapshot = account.balance; // 100, right before the redeem
        account.apply_redeem(30).unwrap(); // 70

        account.revert_redeem(snapshot, 30);
        assert_eq!(account.balance, 100);
        assert!(account.is_consistent());
    }
}
