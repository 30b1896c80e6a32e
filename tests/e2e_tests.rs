//! End-to-end integration tests
//!
//! These tests replay predefined CSV fixtures through the complete pipeline.
//! Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays all commands against a fresh ledger
//! 3. Generates output CSV
//! 4. Compares actual output with expected.csv
//!
//! Fixtures live in tests/fixtures/ and cover:
//! - Happy path scenarios (income, expense, transfers, dated entries)
//! - Rejected transfers (insufficient balance, zero and negative amounts)
//! - References (void, duplicate labels, voiding transfers) and close/reopen
//! - Currency mismatch, unknown and closed accounts
//! - Malformed rows
//! - Chains of dependent transfers across many accounts
//!
//! Each fixture runs for every strategy against every storage backend; the async
//! strategy uses small batches so dependent commands cross batch boundaries.

#[cfg(test)]
mod tests {
    use ledger_engine::cli::{StoreType, StrategyType};
    use ledger_engine::core::{Ledger, Replayer};
    use ledger_engine::strategy::{create_strategy, BatchConfig};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::{NamedTempFile, TempDir};

    fn open_ledger(store: &StoreType, dir: &TempDir) -> Ledger {
        match store {
            StoreType::Memory => Ledger::in_memory(),
            StoreType::Sqlite => Ledger::sqlite(dir.path().join("ledger.db"))
                .expect("Failed to open SQLite ledger"),
        }
    }

    fn batch_config(strategy_type: &StrategyType) -> Option<BatchConfig> {
        match strategy_type {
            StrategyType::Sync => None,
            StrategyType::Async => Some(BatchConfig::new(3, 4)),
        }
    }

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare with expected.csv
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType, store: StoreType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let dir = TempDir::new().expect("Failed to create temp dir");
        let replayer = Arc::new(Replayer::new(open_ledger(&store, &dir), "e2e"));
        let strategy = create_strategy(strategy_type.clone(), batch_config(&strategy_type));

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), Arc::clone(&replayer), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay commands: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?}, store: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, store, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures with both strategies and both stores
    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("references")]
    #[case("currency_mismatch")]
    #[case("malformed_data")]
    #[case("multiple_accounts")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
        #[values(StoreType::Memory, StoreType::Sqlite)] store: StoreType,
    ) {
        run_test_fixture(fixture, strategy, store);
    }

    #[rstest]
    fn test_replay_keeps_history_consistent(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let replayer = Arc::new(Replayer::new(open_ledger(&StoreType::Sqlite, &dir), "e2e"));
        let mut output = Vec::new();

        create_strategy(strategy.clone(), batch_config(&strategy))
            .process(
                Path::new("tests/fixtures/happy_path/input.csv"),
                Arc::clone(&replayer),
                &mut output,
            )
            .unwrap();

        let ledger = replayer.ledger();
        assert!(ledger.reconcile().unwrap().is_empty());

        let stats = ledger.get_dashboard_stats().unwrap();
        assert_eq!(stats.total_balance, dec!(6549.76));
        assert_eq!(stats.company_balance, dec!(3300.51));
        assert_eq!(stats.personal_balance, dec!(3249.25));
        // two opening entries, four income/expense lines and two transfers (two halves each)
        assert_eq!(stats.transaction_count, 10);

        let page = ledger
            .get_transactions_paginated(1, 3, Some("invoice"), None)
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].description, "Invoice 42");
    }

    #[test]
    fn test_sqlite_ledger_survives_reopen() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        {
            let replayer = Arc::new(Replayer::new(open_ledger(&StoreType::Sqlite, &dir), "e2e"));
            let mut output = Vec::new();
            create_strategy(StrategyType::Sync, None)
                .process(
                    Path::new("tests/fixtures/multiple_accounts/input.csv"),
                    replayer,
                    &mut output,
                )
                .unwrap();
        }

        let reopened = open_ledger(&StoreType::Sqlite, &dir);
        let mut balances: Vec<_> = reopened
            .get_accounts()
            .unwrap()
            .into_iter()
            .map(|a| (a.name, a.balance))
            .collect();
        balances.sort();

        assert_eq!(
            balances,
            vec![
                ("A".to_string(), dec!(200)),
                ("B".to_string(), dec!(10)),
                ("C".to_string(), dec!(0)),
                ("D".to_string(), dec!(195)),
            ]
        );
    }
}
