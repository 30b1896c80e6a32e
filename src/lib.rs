//! Ledger Engine Library
//!
//! # Overview
//!
//! This library provides a personal-finance ledger core: accounts with fixed-point
//! balances, an append-only transaction history, atomic transfers between
//! accounts, paginated search, and dashboard aggregation. Two storage backends
//! implement the same contract, and a CSV replay front end drives the ledger
//! with either a sync or an async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transaction, errors, pagination)
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - `AccountStore`, `TransactionLog` and `LedgerStore` contracts
//!   - [`core::memory`] - In-memory backend
//!   - [`core::sqlite`] - SQLite backend
//!   - [`core::ledger`] - The `Ledger` facade used by collaborators
//!   - [`core::dashboard`] - Dashboard statistics and balance reconciliation
//!   - [`core::replay`] / [`core::batch_processor`] - CSV command replay
//! - [`io`] - CSV input/output and JSON reporting
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Invariants
//!
//! - Every balance change is recorded as a transaction in the same atomic unit,
//!   so an account's balance equals the signed sum of its transactions until a
//!   transaction is soft-deleted.
//! - A transfer writes a `transfer_out` and a `transfer_in` sharing one pair id,
//!   or nothing at all.
//! - A transfer never leaves its source account below zero.
//!
//! # Example
//!
//! ```
//! use ledger_engine::{AccountClass, Ledger, NewAccount};
//! use rust_decimal::Decimal;
//!
//! let ledger = Ledger::in_memory();
//! let bank = ledger
//!     .create_account(
//!         NewAccount::new("alice", AccountClass::Personal, "Bank", "USD")
//!             .with_initial_balance(Decimal::new(100, 0)),
//!     )
//!     .unwrap();
//! let card = ledger
//!     .create_account(NewAccount::new("alice", AccountClass::Personal, "Card", "USD"))
//!     .unwrap();
//!
//! ledger
//!     .perform_transfer(&bank.id, &card.id, Decimal::new(40, 0), "Pay card", None)
//!     .unwrap();
//!
//! assert_eq!(ledger.get_account(&bank.id).unwrap().balance, Decimal::new(60, 0));
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AccountStore, DashboardStats, Ledger, LedgerStore, MemoryLedger, SqliteLedger,
    TransactionLog, TransferReceipt, TransferRequest,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountClass, AccountId, ErrorKind, LedgerError, NewAccount, NewTransaction, Page,
    PageRequest, PairId, Transaction, TransactionId, TransactionType,
};
