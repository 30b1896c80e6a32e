use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay ledger commands from a CSV file and print the final balances
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay ledger commands from a CSV file and print the final balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy used to replay the commands
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for in-order replay or 'async' for batched replay"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of command groups applied concurrently (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of command groups applied concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Storage backend the commands are replayed against
    #[arg(
        long = "store",
        value_name = "STORE",
        env = "LEDGER_STORE",
        default_value = "memory",
        help = "Storage backend: 'memory' or 'sqlite'"
    )]
    pub store: StoreType,

    /// SQLite database file (sqlite store only; in-memory database when omitted)
    #[arg(long = "database", value_name = "PATH", env = "LEDGER_DATABASE")]
    pub database: Option<PathBuf>,

    /// Owner recorded on accounts opened by the replay
    #[arg(
        long = "owner",
        value_name = "OWNER",
        env = "LEDGER_OWNER",
        default_value = "local"
    )]
    pub owner: String,

    /// Write dashboard statistics as JSON to this file after the replay
    #[arg(long = "stats", value_name = "PATH")]
    pub stats: Option<PathBuf>,

    /// Log filter directive written to stderr (e.g. 'info' or 'ledger_engine=debug')
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        env = "LEDGER_LOG",
        default_value = "warn"
    )]
    pub log_level: String,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Available storage backends
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    Memory,
    Sqlite,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take the defaults; zero values are replaced with the
    /// defaults by [`BatchConfig::new`], which logs a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::sqlite_file(
        &["program", "--store", "sqlite", "--database", "ledger.db", "input.csv"],
        StoreType::Sqlite,
        Some("ledger.db")
    )]
    #[case::sqlite_in_memory(&["program", "--store", "sqlite", "input.csv"], StoreType::Sqlite, None)]
    #[case::explicit_memory(&["program", "--store", "memory", "input.csv"], StoreType::Memory, None)]
    fn test_store_parsing(
        #[case] args: &[&str],
        #[case] expected: StoreType,
        #[case] database: Option<&str>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.store, expected);
        assert_eq!(parsed.database, database.map(PathBuf::from));
    }

    #[test]
    fn test_reporting_options() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--owner",
            "alice",
            "--stats",
            "stats.json",
            "--log-level",
            "debug",
            "input.csv",
        ])
        .unwrap();

        assert_eq!(parsed.owner, "alice");
        assert_eq!(parsed.stats, Some(PathBuf::from("stats.json")));
        assert_eq!(parsed.log_level, "debug");
        assert_eq!(parsed.input_file, PathBuf::from("input.csv"));
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "input.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], None, Some(8))]
    #[case::no_options(&["program", "input.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--max-concurrent", "8", "input.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::invalid_store(&["program", "--store", "postgres", "input.csv"])]
    #[case::negative_batch_size(&["program", "--batch-size", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
