//! Transaction journal
//!
//! This module provides the `TransactionJournal`, the in-memory history of every
//! balance-affecting event. Entries are only ever appended; deletion is a
//! lifecycle change that hides an entry from listings.
//!
//! # Ordering
//!
//! Listings are newest first by transaction `date`. Entries sharing a date are
//! ordered by append sequence, latest append first, so results are stable.
//!
//! # Balances
//!
//! The journal never touches balances. Soft-deleting an entry does not reverse
//! the balance change it caused; a compensating entry is required for that.

use crate::types::{
    LedgerError, Lifecycle, NewTransaction, Page, PageRequest, PairId, Transaction,
    TransactionPatch,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Append-only journal of transactions
#[derive(Debug, Default, Clone)]
pub struct TransactionJournal {
    /// All entries in append order
    entries: Vec<Transaction>,

    /// Transaction id to position in `entries`
    index: HashMap<String, usize>,

    /// Pair ids already used by transfers
    pairs: HashSet<PairId>,
}

impl TransactionJournal {
    /// Create an empty journal
    pub fn new() -> Self {
        TransactionJournal {
            entries: Vec::new(),
            index: HashMap::new(),
            pairs: HashSet::new(),
        }
    }

    /// Append a new entry, assigning it a fresh id
    ///
    /// The caller is responsible for validating the input and the account
    /// reference; this only records.
    pub fn append(
        &mut self,
        input: NewTransaction,
        pair_id: Option<PairId>,
        now: DateTime<Utc>,
    ) -> Transaction {
        let txn = input.into_transaction(Uuid::new_v4().to_string(), pair_id, now);

        if let Some(pair_id) = &txn.pair_id {
            self.pairs.insert(pair_id.clone());
        }
        self.index.insert(txn.id.clone(), self.entries.len());
        self.entries.push(txn.clone());
        txn
    }

    /// Whether a transfer already used this pair id
    pub fn contains_pair(&self, pair_id: &str) -> bool {
        self.pairs.contains(pair_id)
    }

    /// Get an active entry
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if absent or soft-deleted.
    pub fn get(&self, id: &str) -> Result<&Transaction, LedgerError> {
        self.index
            .get(id)
            .and_then(|&pos| self.entries.get(pos))
            .filter(|txn| txn.is_active())
            .ok_or_else(|| LedgerError::transaction_not_found(id))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Transaction, LedgerError> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| LedgerError::transaction_not_found(id))?;
        self.entries
            .get_mut(pos)
            .filter(|txn| txn.is_active())
            .ok_or_else(|| LedgerError::transaction_not_found(id))
    }

    /// Active entries, newest first
    pub fn newest_first(&self) -> Vec<&Transaction> {
        let mut positions: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, txn)| txn.is_active())
            .map(|(pos, _)| pos)
            .collect();
        positions.sort_by_key(|&pos| (Reverse(self.entries[pos].date), Reverse(pos)));
        positions.into_iter().map(|pos| &self.entries[pos]).collect()
    }

    /// Active entries, newest first, cloned
    pub fn active(&self) -> Vec<Transaction> {
        self.newest_first().into_iter().cloned().collect()
    }

    /// Active entries of one account, newest first
    pub fn list_by_account(&self, account_id: &str) -> Vec<Transaction> {
        self.newest_first()
            .into_iter()
            .filter(|txn| txn.account_id == account_id)
            .cloned()
            .collect()
    }

    /// One page of active entries matching the request filter
    ///
    /// # Errors
    ///
    /// Returns `InvalidPage` if page or page size is zero.
    pub fn paginate(&self, request: &PageRequest) -> Result<Page<Transaction>, LedgerError> {
        request.validate()?;

        let needle = request.filter.needle();
        let matching: Vec<&Transaction> = self
            .newest_first()
            .into_iter()
            .filter(|txn| {
                request
                    .filter
                    .account_id
                    .as_deref()
                    .is_none_or(|account_id| txn.account_id == account_id)
            })
            .filter(|txn| needle.as_deref().is_none_or(|n| txn.matches_search(n)))
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.page_size as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, request))
    }

    /// Update description and/or category of an active entry
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if absent or soft-deleted
    /// - `MissingField` if the new description is blank
    pub fn annotate(
        &mut self,
        id: &str,
        patch: &TransactionPatch,
    ) -> Result<Transaction, LedgerError> {
        let txn = self.get_mut(id)?;
        patch.apply(txn)?;
        Ok(txn.clone())
    }

    /// Mark an entry as deleted
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if absent or already deleted.
    pub fn soft_delete(&mut self, id: &str, at: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let txn = self.get_mut(id)?;
        txn.lifecycle = Lifecycle::Deleted { at };
        Ok(txn.clone())
    }
}
