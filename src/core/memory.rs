//! Thread-safe in-memory ledger
//!
//! This module provides `MemoryLedger`, which keeps the [`AccountBook`] and the
//! [`TransactionJournal`] behind a single `RwLock`.
//!
//! # Design
//!
//! Reads take the shared lock. Every mutation, and every atomic unit spanning
//! accounts and the journal, runs inside one exclusive critical section, so a
//! read-modify-write of a balance can never interleave with another one and no
//! reader ever observes half of a transfer.
//!
//! Inside a unit all fallible steps (lookups, overdraft check, checked arithmetic,
//! pair id uniqueness) run before the first mutation. Once mutation starts nothing
//! can fail, which is what makes the unit all-or-nothing without an undo log.

use crate::core::account_store::AccountBook;
use crate::core::dashboard::LedgerSnapshot;
use crate::core::traits::{AccountStore, LedgerStore, TransactionLog};
use crate::core::transaction_log::TransactionJournal;
use crate::core::transfer::{ensure_same_currency, TransferReceipt, TransferRequest};
use crate::types::{
    Account, LedgerError, NewAccount, NewTransaction, Page, PageRequest, Transaction,
    TransactionPatch,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: AccountBook,
    journal: TransactionJournal,
}

/// In-memory ledger backend
///
/// Safe to share across threads (`Arc<MemoryLedger>`). Intended for tests, the
/// replay CLI and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::storage("ledger lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::storage("ledger lock poisoned"))
    }
}

impl AccountStore for MemoryLedger {
    fn get_account(&self, id: &str) -> Result<Account, LedgerError> {
        self.read()?.accounts.get(id).cloned()
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.read()?.accounts.active())
    }

    fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        let new = new.validate()?;
        let balance = new.initial_balance;
        let account = new.into_account(Uuid::new_v4().to_string(), balance, Utc::now());
        self.write()?.accounts.insert(account)
    }

    fn adjust_balance(&self, id: &str, delta: Decimal) -> Result<Account, LedgerError> {
        self.write()?.accounts.adjust_balance(id, delta)
    }

    fn soft_delete_account(&self, id: &str) -> Result<Account, LedgerError> {
        self.write()?.accounts.soft_delete(id, Utc::now())
    }
}

impl TransactionLog for MemoryLedger {
    fn append(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        new.validate()?;
        let mut state = self.write()?;
        state.accounts.get(&new.account_id)?;
        Ok(state.journal.append(new, None, Utc::now()))
    }

    fn get_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        self.read()?.journal.get(id).cloned()
    }

    fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.read()?.journal.active())
    }

    fn list_by_account(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.read()?.journal.list_by_account(account_id))
    }

    fn paginate(&self, request: &PageRequest) -> Result<Page<Transaction>, LedgerError> {
        self.read()?.journal.paginate(request)
    }

    fn annotate(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction, LedgerError> {
        self.write()?.journal.annotate(id, patch)
    }

    fn soft_delete_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        self.write()?.journal.soft_delete(id, Utc::now())
    }
}

impl LedgerStore for MemoryLedger {
    fn open_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        let new = new.validate()?;
        let initial = new.initial_balance;
        let now = Utc::now();
        let account = new.into_account(Uuid::new_v4().to_string(), initial, now);

        let mut state = self.write()?;
        let account = state.accounts.insert(account)?;
        if let Some(entry) = NewTransaction::opening_balance(&account.id, initial) {
            state.journal.append(entry, None, now);
        }
        Ok(account)
    }

    fn record_transaction(
        &self,
        new: NewTransaction,
        balance_delta: Decimal,
    ) -> Result<Transaction, LedgerError> {
        new.validate_delta(balance_delta)?;

        let mut state = self.write()?;
        let balance = state
            .accounts
            .plan_adjustment(&new.account_id, balance_delta)?;

        state.accounts.apply_balance(&new.account_id, balance)?;
        Ok(state.journal.append(new, None, Utc::now()))
    }

    fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        request.validate()?;

        let mut state = self.write()?;
        let from = state.accounts.get(&request.from)?;
        let to = state.accounts.get(&request.to)?;
        ensure_same_currency(&from.id, &from.currency, &to.id, &to.currency)?;
        if state.journal.contains_pair(&request.pair_id) {
            return Err(LedgerError::DuplicatePairId {
                pair_id: request.pair_id.clone(),
            });
        }

        let from_balance = state
            .accounts
            .plan_covered_debit(&request.from, request.amount)?;
        let to_balance = state
            .accounts
            .plan_adjustment(&request.to, request.amount)?;

        // Nothing below can fail: both accounts exist and both balances are computed.
        state.accounts.apply_balance(&request.from, from_balance)?;
        state.accounts.apply_balance(&request.to, to_balance)?;

        let now = Utc::now();
        let pair_id = Some(request.pair_id.clone());
        let out_transaction = state
            .journal
            .append(request.out_entry(), pair_id.clone(), now);
        let in_transaction = state.journal.append(request.in_entry(), pair_id, now);

        Ok(TransferReceipt {
            out_transaction,
            in_transaction,
        })
    }

    fn set_balance(&self, id: &str, target: Decimal) -> Result<Account, LedgerError> {
        let mut state = self.write()?;
        let current = state.accounts.get(id)?.balance;
        let delta = target
            .checked_sub(current)
            .ok_or_else(|| LedgerError::arithmetic_overflow("set_balance", id))?;

        match NewTransaction::balance_correction(id, delta) {
            Some(entry) => {
                let account = state.accounts.apply_balance(id, target)?;
                state.journal.append(entry, None, Utc::now());
                Ok(account)
            }
            None => state.accounts.get(id).cloned(),
        }
    }

    fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.read()?;
        Ok(LedgerSnapshot {
            accounts: state.accounts.active(),
            transactions: state.journal.active(),
        })
    }
}
