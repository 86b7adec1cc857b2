//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Compound operations serialize on a store-wide writer lock held
//! across read-validate-write, the embedded-store equivalent of
//! `SELECT ... FOR UPDATE` on the ledger row, and commit through a single
//! `WriteBatch` so the status write and the ledger mutation land together.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use corra_coins_core::{
    BrandId, CoinTransaction, LedgerAccount, ReceiptId, StagedReceipt, TransactionId,
    TransactionStatus, TransactionType, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Approval, CoinStats, Rejection, Store, TransactionFilter};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes compound read-validate-write operations. Read-only
    /// queries never take it.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Take the writer lock for a compound operation.
    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::ConcurrencyConflict("ledger writer lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load a transaction or fail with `NotFound`.
    fn require_transaction(&self, transaction_id: &TransactionId) -> Result<CoinTransaction> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })
    }

    /// Load an account or fail with `NotFound`.
    fn require_account(&self, user_id: &UserId) -> Result<LedgerAccount> {
        self.get_account(user_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "account",
            id: user_id.to_string(),
        })
    }

    /// Stage the account write into a batch.
    fn batch_put_account(&self, batch: &mut WriteBatch, account: &LedgerAccount) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;
        batch.put_cf(&cf_accounts, keys::account_key(&account.user_id), value);
        Ok(())
    }

    /// Stage the transaction write plus its user-index entry into a batch.
    fn batch_put_transaction(&self, batch: &mut WriteBatch, tx: &CoinTransaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let value = Self::serialize(tx)?;
        batch.put_cf(&cf_tx, keys::transaction_key(&tx.id), value);
        batch.put_cf(
            &cf_by_user,
            keys::user_transaction_key(&tx.user_id, &tx.id),
            [],
        );
        Ok(())
    }

    /// Commit a batch.
    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// List a user's transactions via the index, newest first, filtered.
    fn list_by_user(
        &self,
        user_id: &UserId,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CoinTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Collect matching index keys; ULID suffixes make them time-ordered,
        // so reversing yields newest first.
        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut transactions = Vec::new();
        let mut skipped = 0;
        for key in all_keys {
            let tx_id = keys::extract_transaction_id_from_user_key(&key);
            let Some(tx) = self.get_transaction(&tx_id)? else {
                continue;
            };
            if !filter.matches(&tx) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            transactions.push(tx);
            if transactions.len() >= limit {
                break;
            }
        }

        Ok(transactions)
    }

    /// List transactions across all users, newest first, filtered.
    fn list_all(
        &self,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CoinTransaction>> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;

        // ULID keys sort chronologically, so a reverse scan is newest first.
        let iter = self.db.iterator_cf(&cf_tx, IteratorMode::End);

        let mut transactions = Vec::new();
        let mut skipped = 0;
        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let tx: CoinTransaction = Self::deserialize(&value)?;
            if !filter.matches(&tx) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            transactions.push(tx);
            if transactions.len() >= limit {
                break;
            }
        }

        Ok(transactions)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &LedgerAccount) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<LedgerAccount>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CoinTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CoinTransaction>> {
        if let Some(user_id) = filter.user_id {
            self.list_by_user(&user_id, filter, limit, offset)
        } else {
            self.list_all(filter, limit, offset)
        }
    }

    // =========================================================================
    // Staging Operations
    // =========================================================================

    fn stage_receipt(&self, receipt: &StagedReceipt) -> Result<()> {
        let cf = self.cf(cf::STAGED_RECEIPTS)?;
        let key = keys::receipt_key(&receipt.id);
        let value = Self::serialize(receipt)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_receipt(&self, receipt_id: &ReceiptId) -> Result<Option<StagedReceipt>> {
        let cf = self.cf(cf::STAGED_RECEIPTS)?;
        let key = keys::receipt_key(receipt_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock_writes()?;
        let cf_receipts = self.cf(cf::STAGED_RECEIPTS)?;

        let mut batch = WriteBatch::default();
        let mut count = 0;

        let iter = self.db.iterator_cf(&cf_receipts, IteratorMode::Start);
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let receipt: StagedReceipt = Self::deserialize(&value)?;
            if receipt.claimed || receipt.is_expired(now) {
                batch.delete_cf(&cf_receipts, key);
                count += 1;
            }
        }

        if count > 0 {
            self.commit(batch)?;
            tracing::debug!(purged = count, "Purged staged receipts");
        }

        Ok(count)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn claim_receipt(
        &self,
        receipt_id: &ReceiptId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<CoinTransaction> {
        let _guard = self.lock_writes()?;

        let mut receipt = self
            .get_receipt(receipt_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "receipt",
                id: receipt_id.to_string(),
            })?;

        receipt.check_claimable(now)?;

        // The snapshot is the ledger balance at claim time, the baseline
        // for reversal if the transaction is later rejected after approval.
        let account = self
            .get_account(user_id)?
            .unwrap_or_else(|| LedgerAccount::new(*user_id));

        let tx = CoinTransaction::earn(
            *user_id,
            receipt.brand_id,
            receipt.bill_amount,
            receipt.coins_earned(),
            account.balance,
            Some(receipt.receipt_url.clone()),
            receipt.bill_date,
        );

        receipt.mark_claimed(*user_id, now);

        let mut batch = WriteBatch::default();
        let cf_receipts = self.cf(cf::STAGED_RECEIPTS)?;
        batch.put_cf(
            &cf_receipts,
            keys::receipt_key(receipt_id),
            Self::serialize(&receipt)?,
        );
        self.batch_put_account(&mut batch, &account)?;
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        Ok(tx)
    }

    fn create_redeem_request(
        &self,
        user_id: &UserId,
        brand_id: BrandId,
        bill_amount: i64,
        coins: i64,
    ) -> Result<CoinTransaction> {
        if coins <= 0 {
            return Err(StoreError::InvalidAmount(format!(
                "redemption must be positive, got {coins}"
            )));
        }

        let _guard = self.lock_writes()?;
        let account = self.require_account(user_id)?;

        // Soft check so hopeless requests fail at intake; the binding check
        // runs again at approval under the same lock.
        if !account.has_sufficient_balance(coins) {
            return Err(StoreError::InsufficientBalance {
                balance: account.balance,
                required: coins,
            });
        }

        let tx = CoinTransaction::redeem(*user_id, brand_id, bill_amount, coins, account.balance);

        let mut batch = WriteBatch::default();
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        Ok(tx)
    }

    fn approve_transaction(
        &self,
        transaction_id: &TransactionId,
        admin_notes: Option<String>,
    ) -> Result<Approval> {
        let _guard = self.lock_writes()?;

        let mut tx = self.require_transaction(transaction_id)?;

        match tx.status {
            TransactionStatus::Pending => {}
            // Idempotent: re-approving produces no mutation and no error.
            TransactionStatus::Approved => {
                return Ok(Approval::AlreadyApproved { transaction: tx });
            }
            from => {
                return Err(StoreError::InvalidTransition {
                    from,
                    to: TransactionStatus::Approved,
                });
            }
        }

        let mut account = self.require_account(&tx.user_id)?;

        // Re-stamp the snapshot from the balance read under the lock, so a
        // later reversal restores exactly the pre-approval value even when
        // other transactions landed between claim and approval.
        tx.previous_balance = account.balance;

        let new_balance = match tx.transaction_type {
            TransactionType::Earn | TransactionType::WelcomeBonus => {
                let b = account.apply_earn(tx.coins_earned)?;
                tx.balance_after_earn = Some(b);
                b
            }
            TransactionType::Redeem => {
                // An uncovered redeem fails here and nothing is written:
                // the transaction stays Pending for the admin to see.
                let b = account.apply_redeem(tx.coins_redeemed)?;
                tx.balance_after_redeem = Some(b);
                b
            }
            TransactionType::Adjustment => {
                return Err(StoreError::InvalidTransition {
                    from: TransactionStatus::Pending,
                    to: TransactionStatus::Approved,
                });
            }
        };

        tx.transition_to(TransactionStatus::Approved)?;
        if admin_notes.is_some() {
            tx.admin_notes = admin_notes;
        }

        let mut batch = WriteBatch::default();
        self.batch_put_account(&mut batch, &account)?;
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        tracing::info!(
            transaction_id = %tx.id,
            user_id = %tx.user_id,
            new_balance,
            "Transaction approved"
        );

        Ok(Approval::Applied {
            transaction: tx,
            new_balance,
        })
    }

    fn reject_transaction(
        &self,
        transaction_id: &TransactionId,
        note: String,
    ) -> Result<Rejection> {
        let _guard = self.lock_writes()?;

        let mut tx = self.require_transaction(transaction_id)?;

        match tx.status {
            // Pending never touched the ledger: status-only transition.
            TransactionStatus::Pending => {
                tx.transition_to(TransactionStatus::Rejected)?;
                tx.admin_notes = Some(note);

                let mut batch = WriteBatch::default();
                self.batch_put_transaction(&mut batch, &tx)?;
                self.commit(batch)?;

                Ok(Rejection::Rejected { transaction: tx })
            }
            // Approved applied a mutation: revert it from the stored
            // snapshot, never a recomputed delta.
            TransactionStatus::Approved => {
                let mut account = self.require_account(&tx.user_id)?;

                if tx.coins_earned > 0 {
                    account.revert_earn(tx.previous_balance, tx.coins_earned);
                } else if tx.coins_redeemed > 0 {
                    account.revert_redeem(tx.previous_balance, tx.coins_redeemed);
                }

                tx.transition_to(TransactionStatus::Rejected)?;
                tx.admin_notes = Some(note);
                tx.balance_after_earn = None;
                tx.balance_after_redeem = None;

                let mut batch = WriteBatch::default();
                self.batch_put_account(&mut batch, &account)?;
                self.batch_put_transaction(&mut batch, &tx)?;
                self.commit(batch)?;

                tracing::info!(
                    transaction_id = %tx.id,
                    user_id = %tx.user_id,
                    restored_balance = account.balance,
                    "Approved transaction reversed"
                );

                Ok(Rejection::Reversed {
                    new_balance: account.balance,
                    transaction: tx,
                })
            }
            // Idempotent: the reversal already happened (or never applied).
            TransactionStatus::Rejected => Ok(Rejection::AlreadyRejected { transaction: tx }),
            from => Err(StoreError::InvalidTransition {
                from,
                to: TransactionStatus::Rejected,
            }),
        }
    }

    fn record_payment_result(
        &self,
        transaction_id: &TransactionId,
        success: bool,
    ) -> Result<CoinTransaction> {
        let _guard = self.lock_writes()?;

        let mut tx = self.require_transaction(transaction_id)?;
        let now = Utc::now();

        match (tx.status, success) {
            // Payout webhooks retry; re-delivery for a settled transaction
            // is a no-op.
            (TransactionStatus::Paid | TransactionStatus::Failed, _)
            | (TransactionStatus::Unpaid, false) => {
                return Ok(tx);
            }
            // A payout retry after an earlier failure settles the record.
            (TransactionStatus::Unpaid, true) => {
                tx.transition_to(TransactionStatus::Paid)?;
                tx.payment_processed_at = Some(now);
            }
            (TransactionStatus::Approved, true) => {
                tx.transition_to(TransactionStatus::Processed)?;
                tx.processed_at = Some(now);
                tx.transition_to(TransactionStatus::Paid)?;
                tx.payment_processed_at = Some(now);
            }
            (TransactionStatus::Processed, true) => {
                tx.transition_to(TransactionStatus::Paid)?;
                tx.payment_processed_at = Some(now);
            }
            (TransactionStatus::Approved, false) => {
                tx.transition_to(TransactionStatus::Unpaid)?;
            }
            (TransactionStatus::Processed, false) => {
                tx.transition_to(TransactionStatus::Failed)?;
            }
            (from, _) => {
                return Err(StoreError::InvalidTransition {
                    from,
                    to: if success {
                        TransactionStatus::Paid
                    } else {
                        TransactionStatus::Failed
                    },
                });
            }
        }

        // Payout bookkeeping only: the coin ledger is never touched here.
        let mut batch = WriteBatch::default();
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        tracing::info!(
            transaction_id = %tx.id,
            status = ?tx.status,
            "Payment result recorded"
        );

        Ok(tx)
    }

    fn grant_welcome_bonus(
        &self,
        user_id: &UserId,
        coins: i64,
    ) -> Result<(CoinTransaction, i64)> {
        let _guard = self.lock_writes()?;

        // At most one per user, checked against the audit trail.
        let filter = TransactionFilter {
            user_id: Some(*user_id),
            transaction_type: Some(TransactionType::WelcomeBonus),
            ..TransactionFilter::default()
        };
        if !self.list_by_user(user_id, &filter, 1, 0)?.is_empty() {
            return Err(StoreError::DuplicateWelcomeBonus {
                user_id: user_id.to_string(),
            });
        }

        let mut account = self
            .get_account(user_id)?
            .unwrap_or_else(|| LedgerAccount::new(*user_id));

        let previous_balance = account.balance;
        let new_balance = account.apply_earn(coins)?;
        let tx = CoinTransaction::welcome_bonus(*user_id, coins, previous_balance);

        let mut batch = WriteBatch::default();
        self.batch_put_account(&mut batch, &account)?;
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        Ok((tx, new_balance))
    }

    fn apply_adjustment(
        &self,
        user_id: &UserId,
        coins: i64,
        reason: String,
    ) -> Result<(CoinTransaction, i64)> {
        if coins == 0 {
            return Err(StoreError::InvalidAmount(
                "adjustment must be non-zero".into(),
            ));
        }

        let _guard = self.lock_writes()?;
        let mut account = self.require_account(user_id)?;

        let previous_balance = account.balance;
        let new_balance = if coins > 0 {
            account.apply_earn(coins)?
        } else {
            account.apply_redeem(-coins)?
        };

        let tx = CoinTransaction::adjustment(*user_id, coins, previous_balance, reason);

        let mut batch = WriteBatch::default();
        self.batch_put_account(&mut batch, &account)?;
        self.batch_put_transaction(&mut batch, &tx)?;
        self.commit(batch)?;

        Ok((tx, new_balance))
    }

    // =========================================================================
    // Reconciliation Queries
    // =========================================================================

    fn get_stats(&self) -> Result<CoinStats> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;

        let mut total_coins_in_circulation = 0;
        let mut total_users = 0;
        for item in self.db.iterator_cf(&cf_accounts, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let account: LedgerAccount = Self::deserialize(&value)?;
            total_coins_in_circulation += account.balance;
            total_users += 1;
        }

        let mut welcome_bonuses_given = 0;
        let mut pending_redemptions = 0;
        let mut pending_earn_requests = 0;
        for item in self.db.iterator_cf(&cf_tx, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let tx: CoinTransaction = Self::deserialize(&value)?;
            match (tx.transaction_type, tx.status) {
                (TransactionType::WelcomeBonus, _) => welcome_bonuses_given += 1,
                (TransactionType::Redeem, TransactionStatus::Pending) => {
                    pending_redemptions += tx.coins_redeemed;
                }
                (TransactionType::Earn, TransactionStatus::Pending) => {
                    pending_earn_requests += 1;
                }
                _ => {}
            }
        }

        Ok(CoinStats {
            total_coins_in_circulation,
            welcome_bonuses_given,
            pending_redemptions,
            pending_earn_requests,
            total_users,
        })
    }
}
