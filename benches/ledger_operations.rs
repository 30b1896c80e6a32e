//! Benchmark suite for ledger operations
//!
//! Measures transfer throughput on both storage backends and the cost of
//! folding a snapshot into dashboard figures, using the divan framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

use ledger_engine::core::{DashboardStats, LedgerSnapshot};
use ledger_engine::{AccountClass, Ledger, LedgerStore, NewAccount, NewTransaction};
use rust_decimal::Decimal;

fn main() {
    divan::main();
}

fn ledger(sqlite: bool) -> Ledger {
    if sqlite {
        Ledger::sqlite_in_memory().expect("Failed to open SQLite ledger")
    } else {
        Ledger::in_memory()
    }
}

/// Ledger with two funded accounts
fn funded_pair(sqlite: bool) -> (Ledger, String, String) {
    let ledger = ledger(sqlite);
    let open = |name: &str| {
        ledger
            .create_account(
                NewAccount::new("bench", AccountClass::Personal, name, "USD")
                    .with_initial_balance(Decimal::new(1_000_000_000, 0)),
            )
            .expect("Failed to open account")
            .id
    };
    let from = open("From");
    let to = open("To");
    (ledger, from, to)
}

/// Back-and-forth transfers between two accounts
#[divan::bench(args = [false, true], sample_count = 20)]
fn transfers(bencher: divan::Bencher, sqlite: bool) {
    bencher
        .with_inputs(|| funded_pair(sqlite))
        .bench_values(|(ledger, from, to)| {
            for i in 0..100 {
                let (a, b) = if i % 2 == 0 { (&from, &to) } else { (&to, &from) };
                ledger
                    .perform_transfer(a, b, Decimal::new(125, 2), "Bench transfer", None)
                    .expect("Transfer failed");
            }
        });
}

/// Income and expense entries on a single account
#[divan::bench(args = [false, true], sample_count = 20)]
fn entries(bencher: divan::Bencher, sqlite: bool) {
    bencher
        .with_inputs(|| funded_pair(sqlite))
        .bench_values(|(ledger, from, _)| {
            for _ in 0..100 {
                let amount = Decimal::new(999, 2);
                ledger
                    .perform_transaction(NewTransaction::expense(from.as_str(), amount, "Bench"), -amount)
                    .expect("Entry failed");
            }
        });
}

/// Snapshot of a populated ledger with `accounts` accounts and ten entries each
fn populated_snapshot(accounts: usize) -> LedgerSnapshot {
    let ledger = Ledger::in_memory();
    for n in 0..accounts {
        let class = if n % 2 == 0 {
            AccountClass::Company
        } else {
            AccountClass::Personal
        };
        let account = ledger
            .create_account(NewAccount::new("bench", class, format!("Account {}", n), "USD"))
            .expect("Failed to open account");
        for i in 0..10 {
            let amount = Decimal::new(i + 1, 0);
            ledger
                .perform_transaction(NewTransaction::income(account.id.as_str(), amount, "Bench"), amount)
                .expect("Entry failed");
        }
    }
    ledger.store().snapshot().expect("Snapshot failed")
}

/// Dashboard aggregation over snapshots of increasing size
#[divan::bench(args = [10, 100, 1000])]
fn dashboard_fold(bencher: divan::Bencher, accounts: usize) {
    let snapshot = populated_snapshot(accounts);
    bencher
        .with_inputs(|| snapshot.clone())
        .bench_values(DashboardStats::fold);
}
