//! Transaction-related types for the ledger engine
//!
//! This module defines transaction types, stored transaction records, and the
//! inputs used to create or annotate them.

use super::account::AccountId;
use super::error::LedgerError;
use super::lifecycle::Lifecycle;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier (UUID v4)
pub type TransactionId = String;

/// Identifier shared by the two halves of a transfer
pub type PairId = String;

/// Latest year a transaction date may carry
///
/// Dates are persisted as fixed-width RFC 3339 text; a five-digit year gains a
/// `+` prefix that cannot be parsed back and breaks lexical ordering.
pub const MAX_DATE_YEAR: i32 = 9999;

/// Reject dates outside years 0000 to 9999
pub(crate) fn validate_date(date: Option<DateTime<Utc>>) -> Result<(), LedgerError> {
    match date {
        Some(date) if !(0..=MAX_DATE_YEAR).contains(&date.year()) => Err(LedgerError::validation(
            format!("date {} is outside years 0000 to {}", date, MAX_DATE_YEAR),
        )),
        _ => Ok(()),
    }
}

/// Balance-affecting event types
///
/// The sign of each type decides how its amount contributes to the account
/// balance: `+` for income and transfer_in, `-` for expense and transfer_out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money received from outside the ledger
    Income,

    /// Money spent outside the ledger
    ///
    /// Never checked against the balance: accounts may go negative (debt).
    Expense,

    /// Credited half of a transfer
    TransferIn,

    /// Debited half of a transfer
    ///
    /// Only ever created together with its `TransferIn` counterpart after the
    /// source balance was checked to cover the amount.
    TransferOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferIn | TransactionType::TransferOut
        )
    }

    /// Contribution of `amount` to the account balance
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Income | TransactionType::TransferIn => amount,
            TransactionType::Expense | TransactionType::TransferOut => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer_in" => Ok(TransactionType::TransferIn),
            "transfer_out" => Ok(TransactionType::TransferOut),
            other => Err(LedgerError::validation(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// Stored transaction
///
/// Amount, type and account are fixed at creation. Description and category
/// may be annotated later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Always positive; the sign comes from `tx_type`
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    /// Present on transfer halves only
    pub pair_id: Option<PairId>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Contribution of this transaction to its account balance
    pub fn signed_amount(&self) -> Decimal {
        self.tx_type.signed(self.amount)
    }

    /// Case-insensitive substring match on description, category and amount
    ///
    /// `needle` must already be lower case.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
            || self
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle))
            || self.amount.to_string().contains(needle)
    }
}

/// Input for a plain income/expense transaction
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    /// Defaults to the commit time
    pub date: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(
        account_id: impl Into<AccountId>,
        tx_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        NewTransaction {
            account_id: account_id.into(),
            tx_type,
            amount,
            description: description.into(),
            category: None,
            date: None,
        }
    }

    pub fn income(account_id: impl Into<AccountId>, amount: Decimal, description: &str) -> Self {
        Self::new(account_id, TransactionType::Income, amount, description)
    }

    pub fn expense(account_id: impl Into<AccountId>, amount: Decimal, description: &str) -> Self {
        Self::new(account_id, TransactionType::Expense, amount, description)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Entry backing the starting balance of a new account
    ///
    /// `None` for a zero balance.
    pub fn opening_balance(account_id: &str, initial: Decimal) -> Option<Self> {
        Self::adjusting(account_id, initial, "Opening balance", "opening-balance")
    }

    /// Entry backing an administrative balance correction of `delta`
    ///
    /// `None` for a zero delta.
    pub fn balance_correction(account_id: &str, delta: Decimal) -> Option<Self> {
        Self::adjusting(account_id, delta, "Balance correction", "balance-correction")
    }

    fn adjusting(account_id: &str, delta: Decimal, description: &str, category: &str) -> Option<Self> {
        let tx_type = if delta > Decimal::ZERO {
            TransactionType::Income
        } else if delta < Decimal::ZERO {
            TransactionType::Expense
        } else {
            return None;
        };
        Some(Self::new(account_id, tx_type, delta.abs(), description).with_category(category))
    }

    /// Validate the input for the transaction log
    ///
    /// Transfer halves are rejected here: they carry a pair id and are only
    /// written by the transfer coordinator.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.account_id.trim().is_empty() {
            return Err(LedgerError::missing_field("account_id"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                self.amount,
                self.tx_type.as_str(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::missing_field("description"));
        }
        if self.tx_type.is_transfer() {
            return Err(LedgerError::validation(
                "transfer halves can only be recorded through a transfer",
            ));
        }
        validate_date(self.date)
    }

    /// Validate the input together with the balance delta it must produce
    ///
    /// The delta has to equal the signed amount, otherwise the account balance
    /// would drift away from its transaction history.
    pub fn validate_delta(&self, balance_delta: Decimal) -> Result<(), LedgerError> {
        self.validate()?;
        let expected = self.tx_type.signed(self.amount);
        if balance_delta != expected {
            return Err(LedgerError::validation(format!(
                "balance delta {} does not match {} of {} (expected {})",
                balance_delta, self.tx_type, self.amount, expected
            )));
        }
        Ok(())
    }

    /// Build the stored record
    pub fn into_transaction(
        self,
        id: TransactionId,
        pair_id: Option<PairId>,
        now: DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            tx_type: self.tx_type,
            amount: self.amount,
            description: self.description.trim().to_string(),
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            date: self.date.unwrap_or(now),
            pair_id,
            lifecycle: Lifecycle::Active,
            created_at: now,
        }
    }
}

/// Annotation update for an existing transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub category: Option<String>,
}

impl TransactionPatch {
    /// Apply the patch to a transaction in place
    pub fn apply(&self, txn: &mut Transaction) -> Result<(), LedgerError> {
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(LedgerError::missing_field("description"));
            }
            txn.description = description.trim().to_string();
        }
        if let Some(category) = &self.category {
            let category = category.trim();
            txn.category = (!category.is_empty()).then(|| category.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn sample(description: &str, category: Option<&str>, amount: Decimal) -> Transaction {
        let mut input = NewTransaction::expense("acc", amount, description);
        if let Some(category) = category {
            input = input.with_category(category);
        }
        input.into_transaction("tx".to_string(), None, Utc::now())
    }

    #[rstest]
    #[case(TransactionType::Income, dec!(10), dec!(10))]
    #[case(TransactionType::TransferIn, dec!(10), dec!(10))]
    #[case(TransactionType::Expense, dec!(10), dec!(-10))]
    #[case(TransactionType::TransferOut, dec!(10), dec!(-10))]
    fn test_signed_amount(
        #[case] tx_type: TransactionType,
        #[case] amount: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(tx_type.signed(amount), expected);
    }

    #[rstest]
    #[case("income", TransactionType::Income)]
    #[case("expense", TransactionType::Expense)]
    #[case("transfer_in", TransactionType::TransferIn)]
    #[case("transfer_out", TransactionType::TransferOut)]
    fn test_type_parsing(#[case] input: &str, #[case] expected: TransactionType) {
        assert_eq!(input.parse::<TransactionType>().unwrap(), expected);
        assert_eq!(expected.as_str(), input);
    }

    #[rstest]
    #[case::zero(NewTransaction::income("a", dec!(0), "x"))]
    #[case::negative(NewTransaction::expense("a", dec!(-1), "x"))]
    #[case::blank_description(NewTransaction::income("a", dec!(1), "  "))]
    #[case::blank_account(NewTransaction::income("", dec!(1), "x"))]
    #[case::transfer_half(NewTransaction::new("a", TransactionType::TransferIn, dec!(1), "x"))]
    #[case::five_digit_year(
        NewTransaction::income("a", dec!(1), "x")
            .with_date(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap())
    )]
    #[case::negative_year(
        NewTransaction::income("a", dec!(1), "x")
            .with_date(Utc.with_ymd_and_hms(-1, 12, 31, 0, 0, 0).unwrap())
    )]
    fn test_validate_rejects(#[case] input: NewTransaction) {
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_delta_requires_signed_amount() {
        let input = NewTransaction::expense("a", dec!(25.50), "Groceries");

        assert!(input.validate_delta(dec!(-25.50)).is_ok());
        assert!(input.validate_delta(dec!(25.50)).is_err());
        assert!(input.validate_delta(dec!(-25)).is_err());
    }

    #[test]
    fn test_adjusting_entries_follow_delta_sign() {
        let opening = NewTransaction::opening_balance("a", dec!(-200)).unwrap();
        assert_eq!(opening.tx_type, TransactionType::Expense);
        assert_eq!(opening.amount, dec!(200));
        assert_eq!(opening.category.as_deref(), Some("opening-balance"));

        let correction = NewTransaction::balance_correction("a", dec!(15)).unwrap();
        assert_eq!(correction.tx_type, TransactionType::Income);
        assert_eq!(correction.category.as_deref(), Some("balance-correction"));

        assert!(NewTransaction::opening_balance("a", dec!(0)).is_none());
    }

    #[test]
    fn test_into_transaction_defaults_date_and_trims() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let txn = NewTransaction::income("a", dec!(5), " Salary ")
            .with_category("  ")
            .into_transaction("t1".to_string(), None, now);

        assert_eq!(txn.date, now);
        assert_eq!(txn.description, "Salary");
        assert_eq!(txn.category, None);
        assert!(txn.is_active());
    }

    #[rstest]
    #[case("grocer", true)]
    #[case("FOOD", false)] // needle is expected lower case
    #[case("food", true)]
    #[case("12.5", true)]
    #[case("rent", false)]
    fn test_matches_search(#[case] needle: &str, #[case] expected: bool) {
        let txn = sample("Weekly Groceries", Some("Food"), dec!(112.50));
        assert_eq!(txn.matches_search(needle), expected);
    }

    #[test]
    fn test_patch_updates_annotations_only() {
        let mut txn = sample("Old", Some("misc"), dec!(3));
        let patch = TransactionPatch {
            description: Some("New".to_string()),
            category: Some("".to_string()),
        };

        patch.apply(&mut txn).unwrap();

        assert_eq!(txn.description, "New");
        assert_eq!(txn.category, None);
        assert_eq!(txn.amount, dec!(3));
    }

    #[test]
    fn test_patch_rejects_blank_description() {
        let mut txn = sample("Old", None, dec!(3));
        let patch = TransactionPatch {
            description: Some(" ".to_string()),
            category: None,
        };

        assert_eq!(
            patch.apply(&mut txn).unwrap_err(),
            LedgerError::missing_field("description")
        );
    }
}
