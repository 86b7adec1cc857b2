//! HTTP request handlers.

pub mod accounts;
pub mod admin;
pub mod coins;
pub mod health;
pub mod receipts;
pub mod webhooks;

use serde::Serialize;

use corra_coins_core::CoinTransaction;

/// Transaction representation shared by user and admin endpoints.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Brand, if the transaction is tied to one.
    pub brand_id: Option<String>,
    /// EARN, REDEEM, WELCOME_BONUS or ADJUSTMENT.
    pub transaction_type: String,
    /// Current lifecycle status.
    pub status: String,
    /// Bill amount in whole currency units.
    pub bill_amount: i64,
    /// Coins credited by this transaction.
    pub coins_earned: i64,
    /// Coins debited by this transaction.
    pub coins_redeemed: i64,
    /// Balance snapshot taken before the ledger mutation.
    pub previous_balance: i64,
    /// Balance after the earn side applied, if it has.
    pub balance_after_earn: Option<i64>,
    /// Balance after the redeem side applied, if it has.
    pub balance_after_redeem: Option<i64>,
    /// Receipt image URL, for EARN transactions.
    pub receipt_url: Option<String>,
    /// Bill date as stated on the receipt.
    pub bill_date: Option<String>,
    /// Reviewer notes.
    pub admin_notes: Option<String>,
    /// When the ledger mutation was applied.
    pub processed_at: Option<String>,
    /// When the fiat payout settled.
    pub payment_processed_at: Option<String>,
    /// Last status change.
    pub status_updated_at: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&CoinTransaction> for TransactionResponse {
    fn from(tx: &CoinTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            user_id: tx.user_id.to_string(),
            brand_id: tx.brand_id.map(|b| b.to_string()),
            transaction_type: tx.transaction_type.to_string(),
            status: tx.status.to_string(),
            bill_amount: tx.bill_amount,
            coins_earned: tx.coins_earned,
            coins_redeemed: tx.coins_redeemed,
            previous_balance: tx.previous_balance,
            balance_after_earn: tx.balance_after_earn,
            balance_after_redeem: tx.balance_after_redeem,
            receipt_url: tx.receipt_url.clone(),
            bill_date: tx.bill_date.map(|d| d.to_string()),
            admin_notes: tx.admin_notes.clone(),
            processed_at: tx.processed_at.map(|t| t.to_rfc3339()),
            payment_processed_at: tx.payment_processed_at.map(|t| t.to_rfc3339()),
            status_updated_at: tx.status_updated_at.to_rfc3339(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}
