//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It coordinates the SyncReader (CSV input) and the
//! Replayer (ledger calls), applying commands strictly in input order.
//!
//! # Memory Efficiency
//!
//! Commands are read and applied one at a time; memory usage is bounded by the
//! ledger itself, not by the size of the input file.

use crate::core::Replayer;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use ledger_engine::core::{Ledger, Replayer};
/// use ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let replayer = Arc::new(Replayer::new(Ledger::in_memory(), "local"));
/// let mut output = std::io::stdout();
///
/// SyncProcessingStrategy
///     .process(Path::new("commands.csv"), replayer, &mut output)
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        replayer: Arc<Replayer>,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let reader = SyncReader::new(input_path)?;
        let mut applied = 0u64;

        for result in reader {
            match result {
                Ok(item) => {
                    replayer.apply_or_skip(item.line, item.command)?;
                    applied += 1;
                }
                Err(e @ LedgerError::Parse { .. }) => {
                    warn!(error = %e, "Skipping malformed record");
                }
                Err(e) => return Err(e),
            }
        }
        info!(commands = applied, "Replay finished");

        write_accounts_csv(&replayer.final_accounts()?, output)
    }
}
