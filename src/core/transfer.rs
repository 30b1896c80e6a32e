//! Transfer requests and receipts
//!
//! A transfer is not stored as its own record. It is two transactions sharing a
//! pair id: a `transfer_out` on the source and a `transfer_in` on the destination,
//! with equal amounts. The types here describe the request and the result; the
//! atomic execution lives in each backend's `LedgerStore::transfer`.

use crate::types::transaction::validate_date;
use crate::types::{
    AccountId, LedgerError, NewTransaction, PairId, Transaction, TransactionType,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Request to move funds between two accounts
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub description: String,
    pub pair_id: PairId,
    /// Defaults to the commit time
    pub date: Option<DateTime<Utc>>,
}

impl TransferRequest {
    /// Create a request with a freshly generated pair id
    pub fn new(
        from: impl Into<AccountId>,
        to: impl Into<AccountId>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        TransferRequest {
            from: from.into(),
            to: to.into(),
            amount,
            description: description.into(),
            pair_id: Uuid::new_v4().to_string(),
            date: None,
        }
    }

    pub fn with_pair_id(mut self, pair_id: impl Into<PairId>) -> Self {
        self.pair_id = pair_id.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Validate the request before any account is touched
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive
    /// - `SameAccountTransfer` if source and destination are equal
    /// - `MissingField` for a blank description or pair id
    /// - `Validation` for a date outside years 0000 to 9999
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(self.amount, "transfer"));
        }
        if self.from == self.to {
            return Err(LedgerError::SameAccountTransfer {
                account: self.from.clone(),
            });
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::missing_field("description"));
        }
        if self.pair_id.trim().is_empty() {
            return Err(LedgerError::missing_field("pair_id"));
        }
        validate_date(self.date)
    }

    /// Journal input for the debited half
    pub fn out_entry(&self) -> NewTransaction {
        self.entry(&self.from, TransactionType::TransferOut)
    }

    /// Journal input for the credited half
    pub fn in_entry(&self) -> NewTransaction {
        self.entry(&self.to, TransactionType::TransferIn)
    }

    fn entry(&self, account: &str, tx_type: TransactionType) -> NewTransaction {
        NewTransaction {
            account_id: account.to_string(),
            tx_type,
            amount: self.amount,
            description: self.description.clone(),
            category: Some("transfer".to_string()),
            date: self.date,
        }
    }
}

/// Both halves of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub out_transaction: Transaction,
    pub in_transaction: Transaction,
}

/// Reject transfers across currencies; there is no conversion engine
pub(crate) fn ensure_same_currency(
    from: &str,
    from_currency: &str,
    to: &str,
    to_currency: &str,
) -> Result<(), LedgerError> {
    if from_currency != to_currency {
        return Err(LedgerError::CurrencyMismatch {
            from: from.to_string(),
            from_currency: from_currency.to_string(),
            to: to.to_string(),
            to_currency: to_currency.to_string(),
        });
    }
    Ok(())
}
