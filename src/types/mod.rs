//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `account`: Account records and account-opening input
//! - `transaction`: Transaction records, inputs and identifiers
//! - `lifecycle`: Soft-delete state shared by both record kinds
//! - `query`: Pagination and filtering
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod transaction;

pub use account::{Account, AccountClass, AccountId, NewAccount, ProductDetails};
pub use error::{ErrorKind, LedgerError};
pub use lifecycle::Lifecycle;
pub use query::{Page, PageRequest, TransactionFilter};
pub use transaction::{
    NewTransaction, PairId, Transaction, TransactionId, TransactionPatch, TransactionType,
};
