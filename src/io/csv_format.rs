//! CSV format handling for ledger commands and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to replay commands
//! - Account output serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::core::replay::{EntryCommand, LedgerCommand};
use crate::types::{Account, AccountClass, LedgerError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `op,account,counterparty,amount,currency,class,description,category,date,reference`.
/// Only `op` is always required; which other columns matter depends on the op.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

fn parse_error(message: String) -> LedgerError {
    LedgerError::Parse {
        line: None,
        message,
    }
}

/// Trimmed, non-empty field value
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(field: &'a Option<String>, name: &str, op: &str) -> Result<&'a str, LedgerError> {
    present(field).ok_or_else(|| parse_error(format!("{} requires column '{}'", op, name)))
}

fn parse_amount(value: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(value).map_err(|_| parse_error(format!("Invalid amount '{}'", value)))
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC)
fn parse_date(value: &str) -> Result<DateTime<Utc>, LedgerError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| parse_error(format!("Invalid date '{}'", value)))
}

fn optional_date(field: &Option<String>) -> Result<Option<DateTime<Utc>>, LedgerError> {
    present(field).map(parse_date).transpose()
}

fn owned(field: &Option<String>) -> Option<String> {
    present(field).map(str::to_string)
}

/// Ledger entries need a description; a blank column falls back to the op name
fn description(record: &CsvRecord, op: &str) -> String {
    owned(&record.description).unwrap_or_else(|| op.to_string())
}

fn entry(record: &CsvRecord, op: &str) -> Result<EntryCommand, LedgerError> {
    Ok(EntryCommand {
        account: required(&record.account, "account", op)?.to_string(),
        amount: parse_amount(required(&record.amount, "amount", op)?)?,
        description: description(record, op),
        category: owned(&record.category),
        date: optional_date(&record.date)?,
        reference: owned(&record.reference),
    })
}

/// Convert a CsvRecord to a LedgerCommand
///
/// This function:
/// - Parses the op (case-insensitive)
/// - Checks the columns the op needs are present
/// - Parses amounts into Decimal and dates into UTC timestamps
///
/// Semantic checks (positive amounts, known accounts, ...) are left to the
/// ledger so they are reported the same way for every input source.
///
/// # Errors
///
/// Returns `Parse` for an unknown op, a missing required column, or an
/// unparsable amount, class or date.
pub fn convert_csv_record(record: CsvRecord) -> Result<LedgerCommand, LedgerError> {
    let op = record.op.trim().to_lowercase();

    let command = match op.as_str() {
        "open" => LedgerCommand::Open {
            name: required(&record.account, "account", &op)?.to_string(),
            class: AccountClass::from_str(required(&record.class, "class", &op)?)
                .map_err(|e| parse_error(e.to_string()))?,
            currency: required(&record.currency, "currency", &op)?.to_string(),
            initial_balance: present(&record.amount)
                .map(parse_amount)
                .transpose()?
                .unwrap_or(Decimal::ZERO),
        },
        "income" => LedgerCommand::Income(entry(&record, &op)?),
        "expense" => LedgerCommand::Expense(entry(&record, &op)?),
        "transfer" => LedgerCommand::Transfer {
            from: required(&record.account, "account", &op)?.to_string(),
            to: required(&record.counterparty, "counterparty", &op)?.to_string(),
            amount: parse_amount(required(&record.amount, "amount", &op)?)?,
            description: description(&record, &op),
            date: optional_date(&record.date)?,
            reference: owned(&record.reference),
        },
        "correct" => LedgerCommand::Correct {
            account: required(&record.account, "account", &op)?.to_string(),
            balance: parse_amount(required(&record.amount, "amount", &op)?)?,
        },
        "close" => LedgerCommand::Close {
            account: required(&record.account, "account", &op)?.to_string(),
        },
        "void" => LedgerCommand::Void {
            reference: required(&record.reference, "reference", &op)?.to_string(),
        },
        _ => return Err(parse_error(format!("Invalid op: '{}'", record.op))),
    };

    Ok(command)
}

/// Write account balances to CSV format
///
/// Writes accounts in CSV format with columns: account, class, currency, balance.
/// Accounts are sorted by name for deterministic output; balances are rounded to
/// two decimal places.
///
/// # Errors
///
/// Returns an `Io`-kind error if the output cannot be written.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "class", "currency", "balance"])?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for account in sorted {
        let balance = format!("{:.2}", account.balance);
        writer.write_record([
            account.name.as_str(),
            account.class.as_str(),
            account.currency.as_str(),
            balance.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn record(op: &str) -> CsvRecord {
        CsvRecord {
            op: op.to_string(),
            ..CsvRecord::default()
        }
    }

    fn with(mut record: CsvRecord, field: &str, value: &str) -> CsvRecord {
        let value = Some(value.to_string());
        match field {
            "account" => record.account = value,
            "counterparty" => record.counterparty = value,
            "amount" => record.amount = value,
            "currency" => record.currency = value,
            "class" => record.class = value,
            "description" => record.description = value,
            "category" => record.category = value,
            "date" => record.date = value,
            "reference" => record.reference = value,
            other => panic!("unknown field {}", other),
        }
        record
    }

    #[test]
    fn test_convert_open() {
        let input = with(
            with(with(with(record("OPEN"), "account", "Bank"), "class", "company"), "currency", "usd"),
            "amount",
            " 250.50 ",
        );

        assert_eq!(
            convert_csv_record(input).unwrap(),
            LedgerCommand::Open {
                name: "Bank".to_string(),
                class: AccountClass::Company,
                currency: "usd".to_string(),
                initial_balance: dec!(250.50),
            }
        );
    }

    #[test]
    fn test_convert_expense_with_date_and_reference() {
        let input = with(
            with(
                with(
                    with(with(record("expense"), "account", "Card"), "amount", "12.5"),
                    "description",
                    "Lunch",
                ),
                "date",
                "2024-03-05",
            ),
            "reference",
            "e1",
        );

        let LedgerCommand::Expense(entry) = convert_csv_record(input).unwrap() else {
            panic!("expected an expense");
        };
        assert_eq!(entry.account, "Card");
        assert_eq!(entry.amount, dec!(12.5));
        assert_eq!(entry.description, "Lunch");
        assert_eq!(entry.category, None);
        assert_eq!(entry.date, Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
        assert_eq!(entry.reference.as_deref(), Some("e1"));
    }

    #[test]
    fn test_convert_transfer_defaults_description() {
        let input = with(with(with(record("Transfer"), "account", "A"), "counterparty", "B"), "amount", "5");

        let LedgerCommand::Transfer { description, reference, .. } = convert_csv_record(input).unwrap() else {
            panic!("expected a transfer");
        };
        assert_eq!(description, "transfer");
        assert_eq!(reference, None);
    }

    #[rstest]
    #[case("2024-03-05T10:30:00Z", Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap())]
    #[case("2024-03-05T12:30:00+02:00", Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap())]
    #[case("2024-03-05", Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())]
    fn test_parse_date(#[case] input: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_date(input).unwrap(), expected);
    }

    #[rstest]
    #[case::invalid_op(record("deposit"), "Invalid op")]
    #[case::open_without_class(with(with(record("open"), "account", "A"), "currency", "USD"), "requires column 'class'")]
    #[case::income_without_amount(with(record("income"), "account", "A"), "requires column 'amount'")]
    #[case::blank_amount(with(with(record("income"), "account", "A"), "amount", "  "), "requires column 'amount'")]
    #[case::bad_amount(with(with(record("income"), "account", "A"), "amount", "ten"), "Invalid amount")]
    #[case::transfer_without_counterparty(with(with(record("transfer"), "account", "A"), "amount", "1"), "requires column 'counterparty'")]
    #[case::void_without_reference(record("void"), "requires column 'reference'")]
    #[case::bad_date(with(with(with(record("income"), "account", "A"), "amount", "1"), "date", "05/03/2024"), "Invalid date")]
    fn test_convert_errors(#[case] input: CsvRecord, #[case] expected: &str) {
        let err = convert_csv_record(input).unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::Io);
        assert!(err.to_string().contains(expected), "{}", err);
    }

    #[test]
    fn test_write_accounts_csv_sorted_by_name() {
        let now = Utc::now();
        let accounts = vec![
            crate::types::NewAccount::new("o", AccountClass::Personal, "Card", "USD")
                .into_account("2".to_string(), dec!(-40), now),
            crate::types::NewAccount::new("o", AccountClass::Company, "Bank", "USD")
                .into_account("1".to_string(), dec!(60.1), now),
        ];
        let mut output = Vec::new();

        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,class,currency,balance\nBank,company,USD,60.10\nCard,personal,USD,-40.00\n"
        );
    }

    #[test]
    fn test_write_accounts_csv_empty() {
        let mut output = Vec::new();
        write_accounts_csv(&[], &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "account,class,currency,balance\n");
    }
}
