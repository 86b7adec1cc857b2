//! Staged receipt types.
//!
//! An anonymously uploaded receipt is held here until the user
//! authenticates and claims it. Claiming is the single allowed mutation;
//! expiry is evaluated at claim time, so the periodic purge is storage
//! hygiene only, never a correctness guard.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoinError, Result};
use crate::{BrandId, ReceiptId, SessionId, UserId};

/// Default staging TTL: receipts unclaimed after this window are not
/// eligible for claiming.
pub const DEFAULT_RECEIPT_TTL_MINUTES: i64 = 24 * 60;

/// A receipt upload awaiting a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedReceipt {
    /// Unique receipt ID (ULID for time-ordering).
    pub id: ReceiptId,

    /// Anonymous session that produced the upload.
    pub session_id: SessionId,

    /// Brand the bill was incurred at.
    pub brand_id: BrandId,

    /// Claimed bill amount in whole currency units.
    pub bill_amount: i64,

    /// URL of the uploaded receipt image.
    pub receipt_url: String,

    /// Original upload file name.
    pub file_name: Option<String>,

    /// Brand earn percentage captured at stage time. Consumed, not
    /// computed, by this core; claim prices the receipt with it without a
    /// brand lookup.
    pub earn_percent: u8,

    /// Date printed on the bill, if the uploader provided one.
    pub bill_date: Option<NaiveDate>,

    /// Past this instant the receipt can no longer be claimed.
    pub expires_at: DateTime<Utc>,

    /// Whether a user has claimed this receipt.
    pub claimed: bool,

    /// Who claimed it.
    pub claimed_by: Option<UserId>,

    /// When it was claimed.
    pub claimed_at: Option<DateTime<Utc>>,

    /// When the upload was staged.
    pub created_at: DateTime<Utc>,
}

impl StagedReceipt {
    /// Stage a new receipt upload.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        brand_id: BrandId,
        bill_amount: i64,
        receipt_url: String,
        file_name: Option<String>,
        earn_percent: u8,
        bill_date: Option<NaiveDate>,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReceiptId::generate(),
            session_id,
            brand_id,
            bill_amount,
            receipt_url,
            file_name,
            earn_percent,
            bill_date,
            expires_at: now + Duration::minutes(ttl_minutes),
            claimed: false,
            claimed_by: None,
            claimed_at: None,
            created_at: now,
        }
    }

    /// Coins this receipt earns when claimed, rounded down to a whole coin.
    ///
    /// Saturates rather than wrapping; the intake boundary rejects bills
    /// above [`crate::brand::MAX_BILL_AMOUNT`] before any row is staged.
    #[must_use]
    pub const fn coins_earned(&self) -> i64 {
        self.bill_amount.saturating_mul(self.earn_percent as i64) / 100
    }

    /// Check whether the receipt is past its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check that the receipt can be claimed right now.
    ///
    /// # Errors
    ///
    /// - `ReceiptAlreadyClaimed` if a user already claimed it. Checked
    ///   before expiry so a claimed-then-expired row reports the claim.
    /// - `ReceiptExpired` if `now` is past `expires_at`.
    pub fn check_claimable(&self, now: DateTime<Utc>) -> Result<()> {
        if self.claimed {
            return Err(CoinError::ReceiptAlreadyClaimed {
                receipt_id: self.id.to_string(),
            });
        }
        if self.is_expired(now) {
            return Err(CoinError::ReceiptExpired {
                receipt_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    /// Mark the receipt claimed. The caller must have passed
    /// [`Self::check_claimable`] first, under the store's writer lock.
    pub fn mark_claimed(&mut self, user_id: UserId, now: DateTime<Utc>) {
        self.claimed = true;
        self.claimed_by = Some(user_id);
        self.claimed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(ttl_minutes: i64) -> StagedReceipt {
        StagedReceipt::new(
            SessionId::generate(),
            BrandId::generate(),
            500,
            "https://cdn.example.com/r/1.jpg".into(),
            Some("bill.jpg".into()),
            10,
            None,
            ttl_minutes,
        )
    }

    #[test]
    fn coins_earned_rounds_down() {
        let mut receipt = staged(60);
        receipt.bill_amount = 509;
        assert_eq!(receipt.coins_earned(), 50);
    }

    #[test]
    fn coins_earned_saturates_on_extreme_amounts() {
        let mut receipt = staged(60);
        receipt.bill_amount = i64::MAX / 2;
        assert_eq!(receipt.coins_earned(), i64::MAX / 100);
    }

    #[test]
    fn fresh_receipt_is_claimable() {
        let receipt = staged(60);
        assert!(receipt.check_claimable(Utc::now()).is_ok());
    }

    #[test]
    fn expired_receipt_reports_expired() {
        let receipt = staged(60);
        let later = Utc::now() + Duration::minutes(61);
        assert!(receipt.is_expired(later));
        assert!(matches!(
            receipt.check_claimable(later),
            Err(CoinError::ReceiptExpired { .. })
        ));
    }

    #[test]
    fn claimed_receipt_reports_already_claimed() {
        let mut receipt = staged(60);
        receipt.mark_claimed(UserId::generate(), Utc::now());
        assert!(matches!(
            receipt.check_claimable(Utc::now()),
            Err(CoinError::ReceiptAlreadyClaimed { .. })
        ));
    }

    #[test]
    fn claimed_wins_over_expired_for_observability() {
        let mut receipt = staged(60);
        receipt.mark_claimed(UserId::generate(), Utc::now());
        let later = Utc::now() + Duration::minutes(120);
        assert!(matches!(
            receipt.check_claimable(later),
            Err(CoinError::ReceiptAlreadyClaimed { .. })
        ));
    }
}
