//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the ProcessingStrategy
//! trait. Commands are read in batches and each batch is split into groups of
//! commands that touch disjoint accounts and references.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (key partitioning + blocking tasks)
//!         └── Replayer (DashMap registries over a shared Ledger)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another
//! - Within a batch, commands sharing an account name or reference run in input order
//! - Independent groups run concurrently, bounded by `max_concurrent`
//!
//! The final balances are therefore the same as a sequential replay of the file.

use crate::core::{BatchProcessor, Replayer};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::ProcessingStrategy;
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Maximum number of command groups applied concurrently
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                fallback = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                max_concurrent,
                fallback = default.max_concurrent,
                "Invalid max_concurrent, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy with the specified configuration
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    async fn replay(&self, input_path: &Path, replayer: Arc<Replayer>) -> Result<(), LedgerError> {
        let processor = BatchProcessor::new(replayer, self.config.max_concurrent);

        let file = tokio::fs::File::open(input_path)
            .await
            .map_err(|e| LedgerError::Io {
                message: format!("Failed to open file '{}': {}", input_path.display(), e),
            })?;

        // csv-async reads through the futures I/O traits
        let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
        let mut reader = AsyncReader::new(compat_file);

        let mut batches = 0u64;
        loop {
            let batch = reader.read_batch(self.config.batch_size).await?;
            if batch.is_empty() {
                break;
            }
            debug!(batch = batches, commands = batch.len(), "Processing batch");
            processor.process_batch(batch).await?;
            batches += 1;
        }
        info!(batches, "Replay finished");
        Ok(())
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        replayer: Arc<Replayer>,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .build()
            .map_err(|e| LedgerError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(self.replay(input_path, Arc::clone(&replayer)))?;

        write_accounts_csv(&replayer.final_accounts()?, output)
    }
}
