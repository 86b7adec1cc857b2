//! Brand rate math.
//!
//! Brands are external collaborators: this core consumes their earn/redeem
//! percentages and redemption caps, it never computes or stores them.

use serde::{Deserialize, Serialize};

use crate::error::{CoinError, Result};

/// Largest bill amount accepted anywhere coins are priced from a bill.
///
/// Keeps `bill_amount * percent` comfortably inside `i64` for any
/// percentage up to 100.
pub const MAX_BILL_AMOUNT: i64 = 10_000_000;

/// Reject bill amounts outside `1..=MAX_BILL_AMOUNT`.
///
/// # Errors
///
/// Returns `InvalidAmount` naming the violated bound.
pub fn validate_bill_amount(bill_amount: i64) -> Result<()> {
    if bill_amount <= 0 {
        return Err(CoinError::InvalidAmount(format!(
            "bill amount must be positive, got {bill_amount}"
        )));
    }
    if bill_amount > MAX_BILL_AMOUNT {
        return Err(CoinError::InvalidAmount(format!(
            "bill amount of {bill_amount} exceeds the maximum of {MAX_BILL_AMOUNT}"
        )));
    }
    Ok(())
}

/// The rates a brand offers, as supplied by the brand catalogue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BrandRates {
    /// Percentage of the bill amount earned as coins.
    pub earn_percent: u8,

    /// Maximum percentage of the bill amount payable in coins.
    pub redeem_percent: u8,

    /// Minimum coins per redemption.
    pub min_redemption: i64,

    /// Maximum coins per redemption.
    pub max_redemption: i64,
}

impl BrandRates {
    /// Coins earned for a bill, rounded down to a whole coin.
    ///
    /// Saturates rather than wrapping on out-of-range bills; callers gate
    /// real input through [`validate_bill_amount`] first.
    #[must_use]
    pub const fn coins_earned_for(&self, bill_amount: i64) -> i64 {
        bill_amount.saturating_mul(self.earn_percent as i64) / 100
    }

    /// Validate a requested redemption against the brand's caps and the
    /// bill amount.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` naming the violated cap.
    pub fn validate_redemption(&self, coins: i64, bill_amount: i64) -> Result<()> {
        if coins <= 0 {
            return Err(CoinError::InvalidAmount(format!(
                "redemption must be positive, got {coins}"
            )));
        }
        if coins < self.min_redemption {
            return Err(CoinError::InvalidAmount(format!(
                "redemption of {coins} is below the brand minimum of {}",
                self.min_redemption
            )));
        }
        if coins > self.max_redemption {
            return Err(CoinError::InvalidAmount(format!(
                "redemption of {coins} exceeds the brand maximum of {}",
                self.max_redemption
            )));
        }
        let bill_cap = bill_amount.saturating_mul(i64::from(self.redeem_percent)) / 100;
        if coins > bill_cap {
            return Err(CoinError::InvalidAmount(format!(
                "redemption of {coins} exceeds {}% of the bill ({bill_cap})",
                self.redeem_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> BrandRates {
        BrandRates {
            earn_percent: 10,
            redeem_percent: 50,
            min_redemption: 10,
            max_redemption: 2000,
        }
    }

    #[test]
    fn earn_rounds_down_to_whole_coins() {
        let r = rates();
        assert_eq!(r.coins_earned_for(500), 50);
        assert_eq!(r.coins_earned_for(509), 50);
        assert_eq!(r.coins_earned_for(9), 0);
    }

    #[test]
    fn redemption_within_caps_is_accepted() {
        assert!(rates().validate_redemption(100, 400).is_ok());
    }

    #[test]
    fn redemption_below_minimum_is_rejected() {
        assert!(matches!(
            rates().validate_redemption(5, 400),
            Err(CoinError::InvalidAmount(_))
        ));
    }

    #[test]
    fn redemption_above_maximum_is_rejected() {
        assert!(matches!(
            rates().validate_redemption(3000, 100_000),
            Err(CoinError::InvalidAmount(_))
        ));
    }

    #[test]
    fn bill_amount_bounds_are_enforced() {
        assert!(validate_bill_amount(1).is_ok());
        assert!(validate_bill_amount(MAX_BILL_AMOUNT).is_ok());
        assert!(matches!(
            validate_bill_amount(0),
            Err(CoinError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_bill_amount(MAX_BILL_AMOUNT + 1),
            Err(CoinError::InvalidAmount(_))
        ));
    }

    #[test]
    fn earn_saturates_instead_of_overflowing() {
        let r = rates();
        assert_eq!(r.coins_earned_for(i64::MAX / 2), i64::MAX / 100);
    }

    #[test]
    fn redemption_above_bill_percentage_is_rejected() {
        // 50% of a 100 bill is 50 coins.
        assert!(matches!(
            rates().validate_redemption(60, 100),
            Err(CoinError::InvalidAmount(_))
        ));
        assert!(rates().validate_redemption(50, 100).is_ok());
    }
}
