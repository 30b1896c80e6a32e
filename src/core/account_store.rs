//! Account book
//!
//! This module provides the `AccountBook` struct which holds account records and
//! is the only place balances are changed. It is single-threaded; backends wrap it
//! in their own synchronization so that every read-modify-write happens inside one
//! critical section.
//!
//! The AccountBook is responsible for:
//! - Inserting new accounts
//! - Looking up active accounts
//! - Planning and applying balance changes with checked arithmetic
//! - Soft-deleting accounts
//!
//! Balance changes are split into a *plan* step (validates and computes the new
//! balance, mutates nothing) and an *apply* step. Atomic units plan every change
//! first and only apply once nothing can fail any more.

use crate::types::{Account, AccountId, LedgerError, Lifecycle};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Holds all accounts, active and soft-deleted
#[derive(Debug, Default, Clone)]
pub struct AccountBook {
    /// Map of account ids to account records
    accounts: HashMap<AccountId, Account>,

    /// Account ids in creation order
    order: Vec<AccountId>,
}

impl AccountBook {
    /// Create an empty AccountBook
    pub fn new() -> Self {
        AccountBook {
            accounts: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert a freshly created account
    ///
    /// # Errors
    ///
    /// Returns a validation error if an account with the same id already exists.
    pub fn insert(&mut self, account: Account) -> Result<Account, LedgerError> {
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::validation(format!(
                "account {} already exists",
                account.id
            )));
        }

        self.order.push(account.id.clone());
        self.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    /// Get an active account
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is absent or soft-deleted.
    pub fn get(&self, id: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .get(id)
            .filter(|account| account.is_active())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Whether an active account with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    /// All active accounts in creation order
    pub fn active(&self) -> Vec<Account> {
        self.order
            .iter()
            .filter_map(|id| self.accounts.get(id))
            .filter(|account| account.is_active())
            .cloned()
            .collect()
    }

    /// Compute the balance after adding `delta`, without changing anything
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account is absent or soft-deleted
    /// - `ArithmeticOverflow` if the new balance is not representable
    pub fn plan_adjustment(&self, id: &str, delta: Decimal) -> Result<Decimal, LedgerError> {
        let account = self.get(id)?;
        account
            .balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("adjust_balance", id))
    }

    /// Compute the balance after debiting `amount`, only if the balance covers it
    ///
    /// This is the overdraft check used by transfers; plain expenses never call it.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account is absent or soft-deleted
    /// - `InsufficientBalance` if the current balance is below `amount`
    pub fn plan_covered_debit(&self, id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let account = self.get(id)?;

        if account.balance < amount {
            return Err(LedgerError::insufficient_balance(
                id,
                account.balance,
                amount,
            ));
        }

        account
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", id))
    }

    /// Store a balance previously computed by one of the plan methods
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is absent or soft-deleted.
    pub fn apply_balance(&mut self, id: &str, balance: Decimal) -> Result<Account, LedgerError> {
        let account = self
            .accounts
            .get_mut(id)
            .filter(|account| account.is_active())
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        account.balance = balance;
        Ok(account.clone())
    }

    /// Add `delta` to the balance of an account
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account is absent or soft-deleted
    /// - `ArithmeticOverflow` if the new balance is not representable
    pub fn adjust_balance(&mut self, id: &str, delta: Decimal) -> Result<Account, LedgerError> {
        let balance = self.plan_adjustment(id, delta)?;
        self.apply_balance(id, balance)
    }

    /// Mark an account as deleted
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is absent or already deleted.
    pub fn soft_delete(&mut self, id: &str, at: DateTime<Utc>) -> Result<Account, LedgerError> {
        let account = self
            .accounts
            .get_mut(id)
            .filter(|account| account.is_active())
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        account.lifecycle = Lifecycle::Deleted { at };
        Ok(account.clone())
    }
}
