//! SQLite-backed ledger
//!
//! This module provides `SqliteLedger`, a durable backend built on `rusqlite`.
//!
//! # Design
//!
//! One connection sits behind a `Mutex`. Every mutation runs inside a
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock up front:
//! a second writer (another thread, or another process on the same file) waits
//! up to the busy timeout instead of interleaving its read-modify-write with ours.
//! Dropping an uncommitted `rusqlite::Transaction` rolls it back, so every early
//! return inside a unit leaves the database untouched.
//!
//! Amounts are stored as decimal TEXT and timestamps as RFC 3339 TEXT with
//! microsecond precision, which sorts chronologically.

use crate::core::dashboard::LedgerSnapshot;
use crate::core::traits::{AccountStore, LedgerStore, TransactionLog};
use crate::core::transfer::{ensure_same_currency, TransferReceipt, TransferRequest};
use crate::types::{
    Account, LedgerError, Lifecycle, NewAccount, NewTransaction, Page, PageRequest, PairId,
    ProductDetails, Transaction, TransactionPatch,
};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const SCHEMA: &str = include_str!("schema.sql");

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ACCOUNT_COLUMNS: &str =
    "id, owner_id, class, name, currency, balance, details, deleted_at, created_at";

const TRANSACTION_COLUMNS: &str =
    "id, account_id, type, amount, description, category, date, pair_id, deleted_at, created_at";

/// SQLite ledger backend
#[derive(Debug)]
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database file
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be opened or the schema cannot be
    /// applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening SQLite ledger");
        let conn = Connection::open(path)?;
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            warn!(error = %e, "WAL journal mode unavailable, using default");
        }
        Self::with_connection(conn)
    }

    /// Private in-memory database, gone when the ledger is dropped
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        register_fold_case(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::storage("connection lock poisoned"))
    }

    /// Run `unit` inside one IMMEDIATE transaction
    ///
    /// Commits only if `unit` succeeds. Backend faults raised inside the unit or
    /// by the commit come back as `ConsistencyFault`.
    fn atomic<T>(
        &self,
        operation: &str,
        unit: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = unit(&tx).map_err(|e| e.within_atomic_unit(operation))?;
        tx.commit()
            .map_err(|e| LedgerError::from(e).within_atomic_unit(operation))?;
        Ok(value)
    }
}

/// `fold_case(text)`: Unicode lower-casing, matching `str::to_lowercase`
///
/// The built-in `lower()` only folds ASCII, so "ÖDEME" would never match "ödeme".
fn register_fold_case(conn: &Connection) -> Result<(), LedgerError> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupt(column: &str, value: &str) -> LedgerError {
    LedgerError::storage(format!("corrupt {} column: '{}'", column, value))
}

fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| corrupt(column, value))
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(value).map_err(|_| corrupt(column, value))
}

fn parse_deleted_at(value: Option<String>) -> Result<Lifecycle, LedgerError> {
    let deleted_at = value
        .as_deref()
        .map(|v| parse_time("deleted_at", v))
        .transpose()?;
    Ok(Lifecycle::from_deleted_at(deleted_at))
}

/// `accounts` row as stored
struct AccountRow {
    id: String,
    owner_id: String,
    class: String,
    name: String,
    currency: String,
    balance: String,
    details: Option<String>,
    deleted_at: Option<String>,
    created_at: String,
}

impl AccountRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AccountRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            class: row.get(2)?,
            name: row.get(3)?,
            currency: row.get(4)?,
            balance: row.get(5)?,
            details: row.get(6)?,
            deleted_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = LedgerError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let details = match row.details.as_deref() {
            Some(json) => Some(
                serde_json::from_str::<ProductDetails>(json).map_err(|_| corrupt("details", json))?,
            ),
            None => None,
        };

        Ok(Account {
            class: row.class.parse().map_err(|_| corrupt("class", &row.class))?,
            balance: parse_decimal("balance", &row.balance)?,
            details,
            lifecycle: parse_deleted_at(row.deleted_at)?,
            created_at: parse_time("created_at", &row.created_at)?,
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            currency: row.currency,
        })
    }
}

/// `transactions` row as stored
struct TransactionRow {
    id: String,
    account_id: String,
    tx_type: String,
    amount: String,
    description: String,
    category: Option<String>,
    date: String,
    pair_id: Option<String>,
    deleted_at: Option<String>,
    created_at: String,
}

impl TransactionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TransactionRow {
            id: row.get(0)?,
            account_id: row.get(1)?,
            tx_type: row.get(2)?,
            amount: row.get(3)?,
            description: row.get(4)?,
            category: row.get(5)?,
            date: row.get(6)?,
            pair_id: row.get(7)?,
            deleted_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            tx_type: row
                .tx_type
                .parse()
                .map_err(|_| corrupt("type", &row.tx_type))?,
            amount: parse_decimal("amount", &row.amount)?,
            date: parse_time("date", &row.date)?,
            lifecycle: parse_deleted_at(row.deleted_at)?,
            created_at: parse_time("created_at", &row.created_at)?,
            id: row.id,
            account_id: row.account_id,
            description: row.description,
            category: row.category,
            pair_id: row.pair_id,
        })
    }
}

fn find_account(conn: &Connection, id: &str) -> Result<Account, LedgerError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE id = ?1 AND deleted_at IS NULL",
        ACCOUNT_COLUMNS
    );
    let row = conn
        .query_row(&sql, params![id], AccountRow::read)
        .optional()?
        .ok_or_else(|| LedgerError::account_not_found(id))?;
    Account::try_from(row)
}

fn active_accounts(conn: &Connection) -> Result<Vec<Account>, LedgerError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE deleted_at IS NULL ORDER BY rowid",
        ACCOUNT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], AccountRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(Account::try_from).collect()
}

fn insert_account(conn: &Connection, new: NewAccount) -> Result<Account, LedgerError> {
    let new = new.validate()?;
    let balance = new.initial_balance;
    let account = new.into_account(
        Uuid::new_v4().to_string(),
        balance,
        Utc::now().trunc_subsecs(6),
    );
    let details = account
        .details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| LedgerError::storage(format!("cannot encode product details: {}", e)))?;

    conn.execute(
        "INSERT INTO accounts (id, owner_id, class, name, currency, balance, details, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8)",
        params![
            account.id,
            account.owner_id,
            account.class.as_str(),
            account.name,
            account.currency,
            account.balance.to_string(),
            details,
            format_time(&account.created_at),
        ],
    )?;
    Ok(account)
}

fn store_balance(conn: &Connection, account: &mut Account, balance: Decimal) -> Result<(), LedgerError> {
    conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![balance.to_string(), account.id],
    )?;
    account.balance = balance;
    Ok(())
}

fn adjusted(account: &Account, delta: Decimal, operation: &str) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &account.id))
}

fn insert_transaction(
    conn: &Connection,
    new: NewTransaction,
    pair_id: Option<PairId>,
) -> Result<Transaction, LedgerError> {
    let now = Utc::now().trunc_subsecs(6);
    let mut txn = new.into_transaction(Uuid::new_v4().to_string(), pair_id, now);
    txn.date = txn.date.trunc_subsecs(6);

    conn.execute(
        "INSERT INTO transactions (id, account_id, type, amount, description, category, date, pair_id, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
        params![
            txn.id,
            txn.account_id,
            txn.tx_type.as_str(),
            txn.amount.to_string(),
            txn.description,
            txn.category,
            format_time(&txn.date),
            txn.pair_id,
            format_time(&txn.created_at),
        ],
    )?;
    Ok(txn)
}

fn find_transaction(conn: &Connection, id: &str) -> Result<Transaction, LedgerError> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = ?1 AND deleted_at IS NULL",
        TRANSACTION_COLUMNS
    );
    let row = conn
        .query_row(&sql, params![id], TransactionRow::read)
        .optional()?
        .ok_or_else(|| LedgerError::transaction_not_found(id))?;
    Transaction::try_from(row)
}

/// Active transactions matching `filter` (a SQL condition over `args`), newest first
fn select_transactions(
    conn: &Connection,
    filter: &str,
    args: &[String],
    limit: Option<(u32, u64)>,
) -> Result<Vec<Transaction>, LedgerError> {
    let mut sql = format!(
        "SELECT {} FROM transactions WHERE deleted_at IS NULL AND {} ORDER BY date DESC, seq DESC",
        TRANSACTION_COLUMNS, filter
    );
    if let Some((limit, offset)) = limit {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), TransactionRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(Transaction::try_from).collect()
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards in it taken literally
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn pair_exists(conn: &Connection, pair_id: &str) -> Result<bool, LedgerError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM transactions WHERE pair_id = ?1 LIMIT 1",
            params![pair_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl AccountStore for SqliteLedger {
    fn get_account(&self, id: &str) -> Result<Account, LedgerError> {
        let conn = self.lock()?;
        find_account(&conn, id)
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let conn = self.lock()?;
        active_accounts(&conn)
    }

    fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        self.atomic("create_account", |tx| insert_account(tx, new))
    }

    fn adjust_balance(&self, id: &str, delta: Decimal) -> Result<Account, LedgerError> {
        self.atomic("adjust_balance", |tx| {
            let mut account = find_account(tx, id)?;
            let balance = adjusted(&account, delta, "adjust_balance")?;
            store_balance(tx, &mut account, balance)?;
            Ok(account)
        })
    }

    fn soft_delete_account(&self, id: &str) -> Result<Account, LedgerError> {
        self.atomic("delete_account", |tx| {
            let mut account = find_account(tx, id)?;
            let at = Utc::now().trunc_subsecs(6);
            tx.execute(
                "UPDATE accounts SET deleted_at = ?1 WHERE id = ?2",
                params![format_time(&at), id],
            )?;
            account.lifecycle = Lifecycle::Deleted { at };
            Ok(account)
        })
    }
}

impl TransactionLog for SqliteLedger {
    fn append(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        new.validate()?;
        self.atomic("append", |tx| {
            find_account(tx, &new.account_id)?;
            insert_transaction(tx, new, None)
        })
    }

    fn get_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        let conn = self.lock()?;
        find_transaction(&conn, id)
    }

    fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        let conn = self.lock()?;
        select_transactions(&conn, "1 = 1", &[], None)
    }

    fn list_by_account(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        let conn = self.lock()?;
        select_transactions(&conn, "account_id = ?", &[account_id.to_string()], None)
    }

    fn paginate(&self, request: &PageRequest) -> Result<Page<Transaction>, LedgerError> {
        request.validate()?;

        let mut clauses = vec!["1 = 1"];
        let mut args = Vec::new();
        if let Some(account_id) = &request.filter.account_id {
            clauses.push("account_id = ?");
            args.push(account_id.clone());
        }
        if let Some(needle) = request.filter.needle() {
            clauses.push(
                "(fold_case(description) LIKE ? ESCAPE '\\' \
                 OR fold_case(coalesce(category, '')) LIKE ? ESCAPE '\\' \
                 OR amount LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(&needle);
            args.extend(std::iter::repeat(pattern).take(3));
        }
        let filter = clauses.join(" AND ");

        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM transactions WHERE deleted_at IS NULL AND {}",
                filter
            ),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;
        let items = select_transactions(
            &conn,
            &filter,
            &args,
            Some((request.page_size, request.offset())),
        )?;

        Ok(Page::new(items, u64::try_from(total).unwrap_or_default(), request))
    }

    fn annotate(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction, LedgerError> {
        self.atomic("update_transaction", |tx| {
            let mut txn = find_transaction(tx, id)?;
            patch.apply(&mut txn)?;
            tx.execute(
                "UPDATE transactions SET description = ?1, category = ?2 WHERE id = ?3",
                params![txn.description, txn.category, id],
            )?;
            Ok(txn)
        })
    }

    fn soft_delete_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        self.atomic("delete_transaction", |tx| {
            let mut txn = find_transaction(tx, id)?;
            let at = Utc::now().trunc_subsecs(6);
            tx.execute(
                "UPDATE transactions SET deleted_at = ?1 WHERE id = ?2",
                params![format_time(&at), id],
            )?;
            txn.lifecycle = Lifecycle::Deleted { at };
            Ok(txn)
        })
    }
}

impl LedgerStore for SqliteLedger {
    fn open_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        self.atomic("create_account", |tx| {
            let account = insert_account(tx, new)?;
            if let Some(entry) = NewTransaction::opening_balance(&account.id, account.balance) {
                insert_transaction(tx, entry, None)?;
            }
            Ok(account)
        })
    }

    fn record_transaction(
        &self,
        new: NewTransaction,
        balance_delta: Decimal,
    ) -> Result<Transaction, LedgerError> {
        new.validate_delta(balance_delta)?;
        self.atomic("perform_transaction", |tx| {
            let mut account = find_account(tx, &new.account_id)?;
            let balance = adjusted(&account, balance_delta, "perform_transaction")?;
            store_balance(tx, &mut account, balance)?;
            insert_transaction(tx, new, None)
        })
    }

    fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        request.validate()?;
        self.atomic("perform_transfer", |tx| {
            let mut from = find_account(tx, &request.from)?;
            let mut to = find_account(tx, &request.to)?;
            ensure_same_currency(&from.id, &from.currency, &to.id, &to.currency)?;
            if pair_exists(tx, &request.pair_id)? {
                return Err(LedgerError::DuplicatePairId {
                    pair_id: request.pair_id.clone(),
                });
            }

            // Debit only if the balance covers the amount
            if from.balance < request.amount {
                return Err(LedgerError::insufficient_balance(
                    &from.id,
                    from.balance,
                    request.amount,
                ));
            }
            let from_balance = adjusted(&from, -request.amount, "perform_transfer")?;
            let to_balance = adjusted(&to, request.amount, "perform_transfer")?;
            store_balance(tx, &mut from, from_balance)?;
            store_balance(tx, &mut to, to_balance)?;

            let pair_id = Some(request.pair_id.clone());
            let out_transaction = insert_transaction(tx, request.out_entry(), pair_id.clone())?;
            let in_transaction = insert_transaction(tx, request.in_entry(), pair_id)?;
            Ok(TransferReceipt {
                out_transaction,
                in_transaction,
            })
        })
    }

    fn set_balance(&self, id: &str, target: Decimal) -> Result<Account, LedgerError> {
        self.atomic("set_balance", |tx| {
            let mut account = find_account(tx, id)?;
            let delta = target
                .checked_sub(account.balance)
                .ok_or_else(|| LedgerError::arithmetic_overflow("set_balance", id))?;
            if let Some(entry) = NewTransaction::balance_correction(id, delta) {
                store_balance(tx, &mut account, target)?;
                insert_transaction(tx, entry, None)?;
            }
            Ok(account)
        })
    }

    fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let mut conn = self.lock()?;
        // Read both tables from one database snapshot
        let tx = conn.transaction()?;
        let accounts = active_accounts(&tx)?;
        let transactions = select_transactions(&tx, "1 = 1", &[], None)?;
        tx.commit()?;
        Ok(LedgerSnapshot {
            accounts,
            transactions,
        })
    }
}
