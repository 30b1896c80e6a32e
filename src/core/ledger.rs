//! Ledger facade
//!
//! This module provides `Ledger`, the in-process interface collaborators use:
//! HTTP handlers, report generators and the replay CLI all go through it. It
//! owns a shared `LedgerStore` and adds validation, defaults and logging on top
//! of the store's atomic units.
//!
//! `Ledger` is cheap to clone; clones share the same store.

use crate::core::dashboard::{reconcile, BalanceDrift, DashboardStats};
use crate::core::memory::MemoryLedger;
use crate::core::sqlite::SqliteLedger;
use crate::core::traits::LedgerStore;
use crate::core::transfer::{TransferReceipt, TransferRequest};
use crate::types::{
    Account, LedgerError, NewAccount, NewTransaction, Page, PageRequest, PairId,
    Transaction, TransactionPatch,
};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Log a rejected operation and pass the result through
fn logged<T>(operation: &'static str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(e) = &result {
        warn!(operation, kind = ?e.kind(), error = %e, "Ledger operation rejected");
    }
    result
}

/// Shared handle to a ledger store
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    /// Wrap an explicitly constructed store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Ledger { store }
    }

    /// Ledger over a fresh [`MemoryLedger`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    /// Ledger over a SQLite database file
    pub fn sqlite(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Ok(Self::new(Arc::new(SqliteLedger::open(path)?)))
    }

    /// Ledger over a private in-memory SQLite database
    pub fn sqlite_in_memory() -> Result<Self, LedgerError> {
        Ok(Self::new(Arc::new(SqliteLedger::in_memory()?)))
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Open an account
    ///
    /// A non-zero initial balance is backed by an opening entry written in the
    /// same atomic unit.
    ///
    /// # Errors
    ///
    /// - `MissingField` if owner, name or currency is blank
    /// - `InvalidCurrency` if the currency is not a three-letter code
    pub fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        let account = logged("create_account", self.store.open_account(new))?;
        info!(
            account = %account.id,
            name = %account.name,
            class = %account.class,
            balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    /// Active accounts in creation order
    pub fn get_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        debug!("Listing accounts");
        self.store.accounts()
    }

    /// One active account
    pub fn get_account(&self, id: &str) -> Result<Account, LedgerError> {
        debug!(account = id, "Fetching account");
        self.store.get_account(id)
    }

    /// Administrative override of an account balance
    ///
    /// Moves the balance to `target` and records the difference as a
    /// `balance-correction` entry. Equal balances leave everything untouched.
    pub fn adjust_account_balance(&self, id: &str, target: Decimal) -> Result<Account, LedgerError> {
        let account = logged("adjust_account_balance", self.store.set_balance(id, target))?;
        info!(account = id, balance = %account.balance, "Account balance corrected");
        Ok(account)
    }

    /// Soft-delete an account
    pub fn delete_account(&self, id: &str) -> Result<Account, LedgerError> {
        let account = logged("delete_account", self.store.soft_delete_account(id))?;
        info!(account = id, "Account deleted");
        Ok(account)
    }

    /// All active transactions, newest first
    pub fn get_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        debug!("Listing transactions");
        self.store.transactions()
    }

    /// Active transactions of one active account, newest first
    pub fn get_account_transactions(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        debug!(account = account_id, "Listing account transactions");
        self.store.get_account(account_id)?;
        self.store.list_by_account(account_id)
    }

    /// One active transaction
    pub fn get_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        debug!(transaction = id, "Fetching transaction");
        self.store.get_transaction(id)
    }

    /// One page of active transactions, newest first
    ///
    /// # Arguments
    ///
    /// * `page` - 1-based page number
    /// * `limit` - Page size
    /// * `search` - Case-insensitive substring over description, category and amount
    /// * `account_id` - Restrict to one account
    ///
    /// # Errors
    ///
    /// Returns `InvalidPage` if `page` or `limit` is zero.
    pub fn get_transactions_paginated(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
        account_id: Option<&str>,
    ) -> Result<Page<Transaction>, LedgerError> {
        let mut request = PageRequest::new(page, limit);
        if let Some(search) = search {
            request = request.with_search(search);
        }
        if let Some(account_id) = account_id {
            request = request.with_account(account_id);
        }
        debug!(page, limit, ?search, ?account_id, "Paginating transactions");
        logged("get_transactions_paginated", self.store.paginate(&request))
    }

    /// Record an income or expense and apply its balance effect atomically
    ///
    /// Never checks the balance: expenses may drive an account negative.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` / `MissingField` for malformed input
    /// - `Validation` if `balance_delta` is not the signed amount
    /// - `AccountNotFound` if the account is missing or deleted
    pub fn perform_transaction(
        &self,
        new: NewTransaction,
        balance_delta: Decimal,
    ) -> Result<Transaction, LedgerError> {
        let txn = logged(
            "perform_transaction",
            self.store.record_transaction(new, balance_delta),
        )?;
        info!(
            transaction = %txn.id,
            account = %txn.account_id,
            tx_type = %txn.tx_type,
            amount = %txn.amount,
            "Transaction recorded"
        );
        Ok(txn)
    }

    /// Move funds between two accounts as one atomic unit
    ///
    /// A fresh pair id is generated when `pair_id` is `None`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount`, `SameAccountTransfer`, `MissingField` for a malformed request
    /// - `CurrencyMismatch` if the accounts hold different currencies
    /// - `DuplicatePairId` if the pair id was already used
    /// - `InsufficientBalance` if the source cannot cover the amount
    pub fn perform_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        description: &str,
        pair_id: Option<PairId>,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut request = TransferRequest::new(from, to, amount, description);
        if let Some(pair_id) = pair_id {
            request = request.with_pair_id(pair_id);
        }
        self.transfer(&request)
    }

    /// Execute a prepared transfer request
    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let receipt = logged("perform_transfer", self.store.transfer(request))?;
        info!(
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            pair = %request.pair_id,
            "Transfer committed"
        );
        Ok(receipt)
    }

    /// Update description and/or category of a transaction
    pub fn update_transaction(
        &self,
        id: &str,
        patch: TransactionPatch,
    ) -> Result<Transaction, LedgerError> {
        let txn = logged("update_transaction", self.store.annotate(id, &patch))?;
        info!(transaction = id, "Transaction updated");
        Ok(txn)
    }

    /// Soft-delete a transaction
    ///
    /// The balance effect it already had stays in place; issue a compensating
    /// transaction to reverse it.
    pub fn delete_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        let txn = logged("delete_transaction", self.store.soft_delete_transaction(id))?;
        info!(transaction = id, account = %txn.account_id, "Transaction deleted");
        Ok(txn)
    }

    /// Dashboard figures derived from the current state
    pub fn get_dashboard_stats(&self) -> Result<DashboardStats, LedgerError> {
        debug!("Computing dashboard stats");
        DashboardStats::fold(self.store.snapshot()?)
    }

    /// Accounts whose balance no longer matches their active history
    pub fn reconcile(&self) -> Result<Vec<BalanceDrift>, LedgerError> {
        let drift = reconcile(&self.store.snapshot()?)?;
        for entry in &drift {
            warn!(
                account = %entry.account_id,
                stored = %entry.stored_balance,
                history = %entry.history_balance,
                "Balance drift"
            );
        }
        Ok(drift)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}
