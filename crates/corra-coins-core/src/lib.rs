//! Core types and state-machine logic for the Club Corra coin ledger.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `BrandId`, `SessionId`, `TransactionId`, `ReceiptId`
//! - **Ledger**: `LedgerAccount` with the balance invariants
//! - **Transactions**: `CoinTransaction`, `TransactionType`, `TransactionStatus`
//! - **Staging**: `StagedReceipt` for anonymous receipt uploads
//! - **Brands**: `BrandRates` consumed from the external brand catalogue
//!
//! # Coin unit
//!
//! Coins and bill amounts are whole units stored as `i64`; no fractional
//! amounts exist anywhere in this domain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod brand;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod staging;
pub mod transaction;

pub use brand::{validate_bill_amount, BrandRates, MAX_BILL_AMOUNT};
pub use error::{CoinError, Result};
pub use ids::{BrandId, IdError, ReceiptId, SessionId, TransactionId, UserId};
pub use ledger::{LedgerAccount, DEFAULT_WELCOME_BONUS_COINS};
pub use staging::{StagedReceipt, DEFAULT_RECEIPT_TTL_MINUTES};
pub use transaction::{CoinTransaction, TransactionStatus, TransactionType};
