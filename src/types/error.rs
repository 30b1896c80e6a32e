//! Error types for the ledger engine
//!
//! This module defines every error the ledger core and its replay CLI can produce.
//! Each variant carries enough context to explain the rejection to a caller, and
//! [`LedgerError::kind`] folds the variants onto the coarse taxonomy callers act on.
//!
//! # Error Categories
//!
//! - **Validation**: malformed input (non-positive amount, missing field, bad page)
//! - **Not found**: reference to a missing or soft-deleted account/transaction
//! - **Insufficient balance**: a transfer source cannot cover the amount
//! - **Consistency fault**: an atomic unit could not be committed; it was rolled back
//! - **Storage**: backend fault outside of an atomic unit
//! - **I/O**: file and CSV errors raised by the replay surface

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
///
/// HTTP layers map these onto status codes; the replay CLI uses them to decide
/// whether a rejected command is worth a warning or is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientBalance,
    ConsistencyFault,
    Storage,
    Io,
}

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero, negative, or otherwise unusable for the operation
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that was attempted
        operation: String,
    },

    /// A required field is missing or blank
    #[error("Missing required field '{field}'")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Pagination parameters outside of the accepted range
    #[error("Invalid page request: page {page}, page size {page_size} (both must be >= 1)")]
    InvalidPage { page: u32, page_size: u32 },

    /// Currency code is not a three letter ISO-style code
    #[error("Invalid currency code '{code}'")]
    InvalidCurrency { code: String },

    /// Transfer between accounts held in different currencies
    #[error("Currency mismatch: account {from} holds {from_currency}, account {to} holds {to_currency}")]
    CurrencyMismatch {
        from: String,
        from_currency: String,
        to: String,
        to_currency: String,
    },

    /// Transfer whose source and destination are the same account
    #[error("Transfer source and destination are the same account {account}")]
    SameAccountTransfer { account: String },

    /// Transfer pair id already used by another transfer
    #[error("Transfer pair id {pair_id} is already in use")]
    DuplicatePairId { pair_id: String },

    /// Any other malformed input
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Account does not exist or has been soft-deleted
    #[error("Account {id} not found")]
    AccountNotFound { id: String },

    /// Transaction does not exist or has been soft-deleted
    #[error("Transaction {id} not found")]
    TransactionNotFound { id: String },

    /// Transfer source cannot cover the requested amount
    ///
    /// Not retryable without new input.
    #[error("Insufficient balance in account {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account: String,
        balance: Decimal,
        requested: Decimal,
    },

    /// Balance arithmetic would leave the representable range
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow { operation: String, account: String },

    /// An atomic unit could not be committed and was rolled back
    #[error("Consistency fault during {operation}: {message}")]
    ConsistencyFault { operation: String, message: String },

    /// Backend fault outside of an atomic unit
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// File could not be read or written
    #[error("I/O error: {message}")]
    Io { message: String },

    /// CSV/JSON input or output could not be processed
    #[error("Parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse { line: Option<u64>, message: String },
}

impl LedgerError {
    /// Classify this error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::MissingField { .. }
            | LedgerError::InvalidPage { .. }
            | LedgerError::InvalidCurrency { .. }
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::SameAccountTransfer { .. }
            | LedgerError::DuplicatePairId { .. }
            | LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::AccountNotFound { .. } | LedgerError::TransactionNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::ArithmeticOverflow { .. } | LedgerError::ConsistencyFault { .. } => {
                ErrorKind::ConsistencyFault
            }
            LedgerError::Storage { .. } => ErrorKind::Storage,
            LedgerError::Io { .. } | LedgerError::Parse { .. } => ErrorKind::Io,
        }
    }

    /// Re-label a backend fault raised inside an atomic unit
    ///
    /// Only `Storage` errors change; domain rejections raised inside the unit
    /// (not found, insufficient balance, ...) are returned as they are.
    pub fn within_atomic_unit(self, operation: &str) -> Self {
        match self {
            LedgerError::Storage { message } => LedgerError::ConsistencyFault {
                operation: operation.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Attach an input line to a `Parse` error that has none
    pub fn at_line(self, line: u64) -> Self {
        match self {
            LedgerError::Parse {
                line: None,
                message,
            } => LedgerError::Parse {
                line: Some(line),
                message,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(error: rusqlite::Error) -> Self {
        LedgerError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        if matches!(error.kind(), csv::ErrorKind::Io(_)) {
            return LedgerError::Io {
                message: error.to_string(),
            };
        }
        LedgerError::Parse {
            line: error.position().map(|pos| pos.line()),
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        if matches!(error.kind(), csv_async::ErrorKind::Io(_)) {
            return LedgerError::Io {
                message: error.to_string(),
            };
        }
        LedgerError::Parse {
            line: error.position().map(|pos| pos.line()),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Parse {
            line: None,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: &str) -> Self {
        LedgerError::MissingField {
            field: field.to_string(),
        }
    }

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(id: &str) -> Self {
        LedgerError::AccountNotFound { id: id.to_string() }
    }

    /// Create a TransactionNotFound error
    pub fn transaction_not_found(id: &str) -> Self {
        LedgerError::TransactionNotFound { id: id.to_string() }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account: &str, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Create a ConsistencyFault error
    pub fn consistency_fault(operation: &str, message: impl Into<String>) -> Self {
        LedgerError::ConsistencyFault {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}
