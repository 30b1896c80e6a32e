//! Account-related types for the ledger engine
//!
//! This module defines the Account record, the input used to open one, and the
//! optional product metadata some accounts carry.

use super::error::LedgerError;
use super::lifecycle::Lifecycle;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier (opaque string, UUID v4 when generated by a store)
pub type AccountId = String;

/// Who the account belongs to on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Company,
    Personal,
}

impl AccountClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Company => "company",
            AccountClass::Personal => "personal",
        }
    }
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountClass {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "company" => Ok(AccountClass::Company),
            "personal" => Ok(AccountClass::Personal),
            other => Err(LedgerError::validation(format!(
                "unknown account class '{}'",
                other
            ))),
        }
    }
}

/// Product metadata attached to credit-card and loan accounts
///
/// Informational only: balances never consult it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product", rename_all = "camelCase")]
pub enum ProductDetails {
    #[serde(rename_all = "camelCase")]
    CreditCard {
        credit_limit: Decimal,
        statement_day: u8,
    },
    #[serde(rename_all = "camelCase")]
    Loan {
        principal: Decimal,
        annual_rate: Decimal,
        term_months: u32,
    },
}

/// Account record
///
/// `balance` is only ever changed by a store's atomic primitives. Between
/// operations it equals the signed sum of the account's active transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub owner_id: String,
    pub class: AccountClass,
    /// Bank or display name
    pub name: String,
    /// Three letter currency code, upper case
    pub currency: String,
    pub balance: Decimal,
    pub details: Option<ProductDetails>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Input for opening an account
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub owner_id: String,
    pub class: AccountClass,
    pub name: String,
    pub currency: String,
    /// Starting balance; negative for accounts opened in debt
    pub initial_balance: Decimal,
    pub details: Option<ProductDetails>,
}

impl NewAccount {
    /// Create an input with zero starting balance and no product metadata
    pub fn new(
        owner_id: impl Into<String>,
        class: AccountClass,
        name: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        NewAccount {
            owner_id: owner_id.into(),
            class,
            name: name.into(),
            currency: currency.into(),
            initial_balance: Decimal::ZERO,
            details: None,
        }
    }

    pub fn with_initial_balance(mut self, balance: Decimal) -> Self {
        self.initial_balance = balance;
        self
    }

    pub fn with_details(mut self, details: ProductDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Validate required fields and normalize the currency code
    ///
    /// # Errors
    ///
    /// - `MissingField` if owner, name or currency is blank
    /// - `InvalidCurrency` if the currency is not three ASCII letters
    pub fn validate(&self) -> Result<NewAccount, LedgerError> {
        if self.owner_id.trim().is_empty() {
            return Err(LedgerError::missing_field("owner_id"));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::missing_field("name"));
        }

        let currency = self.currency.trim();
        if currency.is_empty() {
            return Err(LedgerError::missing_field("currency"));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidCurrency {
                code: currency.to_string(),
            });
        }

        Ok(NewAccount {
            owner_id: self.owner_id.trim().to_string(),
            name: self.name.trim().to_string(),
            currency: currency.to_ascii_uppercase(),
            ..self.clone()
        })
    }

    /// Build the stored record for this input with the given starting balance
    pub fn into_account(self, id: AccountId, balance: Decimal, now: DateTime<Utc>) -> Account {
        Account {
            id,
            owner_id: self.owner_id,
            class: self.class,
            name: self.name,
            currency: self.currency,
            balance,
            details: self.details,
            lifecycle: Lifecycle::Active,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("company", AccountClass::Company)]
    #[case("Personal", AccountClass::Personal)]
    #[case(" COMPANY ", AccountClass::Company)]
    fn test_account_class_parsing(#[case] input: &str, #[case] expected: AccountClass) {
        assert_eq!(input.parse::<AccountClass>().unwrap(), expected);
    }

    #[test]
    fn test_account_class_rejects_unknown() {
        assert!("business".parse::<AccountClass>().is_err());
    }

    #[test]
    fn test_validate_normalizes_currency() {
        let input = NewAccount::new("owner", AccountClass::Company, " Main ", "try");
        let validated = input.validate().unwrap();

        assert_eq!(validated.currency, "TRY");
        assert_eq!(validated.name, "Main");
    }

    #[rstest]
    #[case::blank_owner(NewAccount::new(" ", AccountClass::Company, "Main", "USD"), "owner_id")]
    #[case::blank_name(NewAccount::new("o", AccountClass::Company, "", "USD"), "name")]
    #[case::blank_currency(NewAccount::new("o", AccountClass::Personal, "Main", ""), "currency")]
    fn test_validate_missing_fields(#[case] input: NewAccount, #[case] field: &str) {
        assert_eq!(input.validate().unwrap_err(), LedgerError::missing_field(field));
    }

    #[rstest]
    #[case("US")]
    #[case("USDT")]
    #[case("U$D")]
    fn test_validate_invalid_currency(#[case] code: &str) {
        let input = NewAccount::new("o", AccountClass::Personal, "Main", code);
        assert!(matches!(
            input.validate(),
            Err(LedgerError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn test_product_details_serialize_tagged() {
        let details = ProductDetails::CreditCard {
            credit_limit: dec!(5000.00),
            statement_day: 12,
        };
        let json = serde_json::to_value(&details).unwrap();

        assert_eq!(json["product"], "creditCard");
        assert_eq!(json["creditLimit"], "5000.00");
        assert_eq!(json["statementDay"], 12);
    }
}
