//! Core traits for account storage, the transaction log, and atomic ledger units
//!
//! This module defines the trait abstractions that allow the in-memory and the
//! SQLite backends to be used interchangeably behind `Arc<dyn LedgerStore>`.
//!
//! Every method takes `&self`: implementations synchronize internally and must be
//! safe to call from many threads at once.

use crate::core::dashboard::LedgerSnapshot;
use crate::core::transfer::{TransferReceipt, TransferRequest};
use crate::types::{
    Account, LedgerError, NewAccount, NewTransaction, Page, PageRequest, Transaction,
    TransactionPatch,
};
use rust_decimal::Decimal;

/// Account records and the balance mutation primitive
///
/// Nothing here touches the transaction log.
pub trait AccountStore: Send + Sync {
    /// Get an active account
    fn get_account(&self, id: &str) -> Result<Account, LedgerError>;

    /// All active accounts in creation order
    fn accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Insert an account whose balance is the given initial balance
    ///
    /// Raw primitive: no opening entry is written. Use
    /// [`LedgerStore::open_account`] to keep the balance backed by history.
    fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError>;

    /// Atomically add `delta` to the balance of an active account
    ///
    /// The read-modify-write happens in one step at the storage boundary;
    /// concurrent calls on the same account never lose an update.
    fn adjust_balance(&self, id: &str, delta: Decimal) -> Result<Account, LedgerError>;

    /// Mark an account as deleted
    fn soft_delete_account(&self, id: &str) -> Result<Account, LedgerError>;
}

/// Append-only history of balance-affecting events
///
/// Appending never changes a balance.
pub trait TransactionLog: Send + Sync {
    /// Record an income/expense entry for an existing active account
    fn append(&self, new: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Get an active transaction
    fn get_transaction(&self, id: &str) -> Result<Transaction, LedgerError>;

    /// All active transactions, newest first
    fn transactions(&self) -> Result<Vec<Transaction>, LedgerError>;

    /// Active transactions of one account, newest first
    fn list_by_account(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError>;

    /// One page of active transactions, newest first
    fn paginate(&self, request: &PageRequest) -> Result<Page<Transaction>, LedgerError>;

    /// Update description and/or category
    fn annotate(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction, LedgerError>;

    /// Mark a transaction as deleted; its past balance effect stays in place
    fn soft_delete_transaction(&self, id: &str) -> Result<Transaction, LedgerError>;
}

/// Operations that span accounts and the log as one atomic unit
///
/// Each method either commits every one of its changes or none of them. A backend
/// fault inside a unit is reported as `ConsistencyFault` after rollback.
pub trait LedgerStore: AccountStore + TransactionLog {
    /// Create an account plus, for a non-zero initial balance, its opening entry
    fn open_account(&self, new: NewAccount) -> Result<Account, LedgerError>;

    /// Append `new` and adjust its account by `balance_delta`
    ///
    /// Never checks the balance: expenses may drive an account negative.
    fn record_transaction(
        &self,
        new: NewTransaction,
        balance_delta: Decimal,
    ) -> Result<Transaction, LedgerError>;

    /// Debit the source only if it covers the amount, credit the destination,
    /// then append both halves
    fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError>;

    /// Move the balance to `target` by appending a correction entry for the difference
    fn set_balance(&self, id: &str, target: Decimal) -> Result<Account, LedgerError>;

    /// Consistent view of active accounts and active transactions (newest first)
    fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError>;
}
