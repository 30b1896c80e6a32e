//! Core business logic module
//!
//! This module contains the ledger core and the replay machinery:
//! - `traits` - Storage abstractions shared by both backends
//! - `account_store` - Single-threaded account book (balances)
//! - `transaction_log` - Single-threaded append-only journal
//! - `transfer` - Transfer requests and receipts
//! - `memory` - In-memory backend
//! - `sqlite` - SQLite backend
//! - `dashboard` - Dashboard aggregation and reconciliation
//! - `ledger` - The `Ledger` facade used by collaborators
//! - `replay` - CSV command replay
//! - `batch_processor` - Concurrent replay of independent command groups

pub mod account_store;
pub mod batch_processor;
pub mod dashboard;
pub mod ledger;
pub mod memory;
pub mod replay;
pub mod sqlite;
pub mod traits;
pub mod transaction_log;
pub mod transfer;

pub use account_store::AccountBook;
pub use batch_processor::BatchProcessor;
pub use dashboard::{reconcile, BalanceDrift, DashboardStats, LedgerSnapshot, RECENT_TRANSACTIONS};
pub use ledger::Ledger;
pub use memory::MemoryLedger;
pub use replay::{EntryCommand, LedgerCommand, RefTarget, Replayer, SequencedCommand};
pub use sqlite::SqliteLedger;
pub use traits::{AccountStore, LedgerStore, TransactionLog};
pub use transaction_log::TransactionJournal;
pub use transfer::{TransferReceipt, TransferRequest};
