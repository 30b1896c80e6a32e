//! Ledger Engine CLI
//!
//! Replays a CSV file of ledger commands and prints the final account balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > balances.csv
//! cargo run -- --strategy sync commands.csv > balances.csv
//! cargo run -- --store sqlite --database ledger.db commands.csv > balances.csv
//! cargo run -- --stats stats.json --log-level info commands.csv > balances.csv
//! ```
//!
//! Malformed rows and rejected commands are logged to stderr and skipped.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (unreadable input, storage fault, unwritable output)

use ledger_engine::cli::{self, CliArgs, StoreType, StrategyType};
use ledger_engine::core::{Ledger, Replayer};
use ledger_engine::io::write_stats_json;
use ledger_engine::strategy;
use ledger_engine::types::LedgerError;
use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn open_ledger(args: &CliArgs) -> Result<Ledger, LedgerError> {
    match (&args.store, &args.database) {
        (StoreType::Memory, _) => Ok(Ledger::in_memory()),
        (StoreType::Sqlite, Some(path)) => Ledger::sqlite(path),
        (StoreType::Sqlite, None) => Ledger::sqlite_in_memory(),
    }
}

fn run(args: CliArgs) -> Result<(), LedgerError> {
    let ledger = open_ledger(&args)?;
    info!(store = ?args.store, strategy = ?args.strategy, "Ledger opened");
    let replayer = Arc::new(Replayer::new(ledger, args.owner.as_str()));

    let strategy = {
        let config = if args.strategy == StrategyType::Async {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), config)
    };

    let mut output = std::io::stdout();
    strategy.process(&args.input_file, Arc::clone(&replayer), &mut output)?;

    if let Some(path) = &args.stats {
        let stats = replayer.ledger().get_dashboard_stats()?;
        let file = File::create(path).map_err(|e| LedgerError::Io {
            message: format!("Failed to create file '{}': {}", path.display(), e),
        })?;
        write_stats_json(&stats, &mut BufWriter::new(file))?;
    }

    Ok(())
}

fn main() {
    let args = cli::parse_args();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        error!(error = %e, "Replay failed");
        process::exit(1);
    }
}
