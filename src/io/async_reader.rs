//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over replay commands from a CSV file.
//! Supports batch reading for efficient async processing.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio (through a compat wrapper) for async file I/O
//! - Batch reading so the batch processor can partition work
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of SequencedCommands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::core::replay::SequencedCommand;
use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::LedgerError;
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::io::AsyncRead;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Malformed rows are logged and skipped; only read failures are returned.
pub struct AsyncReader<R: AsyncRead + Unpin + Send> {
    reader: csv_async::AsyncReader<R>,
    headers: Option<StringRecord>,
    record: StringRecord,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_reader(reader);

        Self {
            reader,
            headers: None,
            record: StringRecord::new(),
        }
    }

    async fn headers(&mut self) -> Result<StringRecord, LedgerError> {
        if let Some(headers) = &self.headers {
            return Ok(headers.clone());
        }
        let headers = self.reader.headers().await?.clone();
        self.headers = Some(headers.clone());
        Ok(headers)
    }

    /// Read a batch of commands
    ///
    /// Reads up to `batch_size` well-formed commands. Rows that fail to parse or
    /// convert are logged with their line number and skipped.
    ///
    /// # Returns
    ///
    /// The commands read, in input order. An empty batch means end of input.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the underlying reader fails.
    pub async fn read_batch(&mut self, batch_size: usize) -> Result<Vec<SequencedCommand>, LedgerError> {
        let headers = self.headers().await?;
        let mut batch = Vec::with_capacity(batch_size);

        while batch.len() < batch_size {
            if !self.reader.read_record(&mut self.record).await? {
                break;
            }
            let line = self.record.position().map_or(0, |pos| pos.line());
            let converted = self
                .record
                .deserialize::<CsvRecord>(Some(&headers))
                .map_err(LedgerError::from)
                .and_then(convert_csv_record);
            match converted {
                Ok(command) => batch.push(SequencedCommand { line, command }),
                Err(e) => warn!(line, error = %e.at_line(line), "Skipping malformed record"),
            }
        }

        Ok(batch)
    }
}
