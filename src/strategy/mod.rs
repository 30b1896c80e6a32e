//! Processing strategy module for command replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and application of the commands to a ledger. This
//! allows different implementations (synchronous, asynchronous batch) to be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::Replayer;
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads commands from a CSV file, applies them through the shared
/// [`Replayer`], and writes the final account balances to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay commands from the input file and write balances to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file
    /// * `replayer` - Replayer bound to the ledger the commands are applied to
    /// * `output` - Writer receiving the `account,class,currency,balance` CSV
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened or read
    /// - The ledger raises a storage or consistency fault
    /// - Output cannot be written
    ///
    /// Malformed rows and rejected commands are logged and skipped; they never
    /// cause this method to fail.
    fn process(
        &self,
        input_path: &Path,
        replayer: Arc<Replayer>,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
