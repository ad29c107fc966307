//! Batching writer in front of a record sink

use crate::record::EnrichedRecord;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use std::path::PathBuf;

/// Totals reported when the writer is closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterStats {
    /// Records successfully handed to the sink
    pub persisted: usize,

    /// Successful non-empty flushes
    pub flushes: usize,

    /// Final destination
    pub location: PathBuf,
}

/// Buffers records and flushes them to a sink in fixed-size batches
///
/// The batch is only cleared after the sink accepted it, so a failed flush
/// loses nothing that is still in memory.
pub struct IncrementalWriter<S: RecordSink> {
    sink: S,
    batch: Vec<EnrichedRecord>,
    batch_size: usize,
    persisted: usize,
    flushes: usize,
    closed: bool,
}

impl<S: RecordSink> IncrementalWriter<S> {
    /// Creates a writer; a `batch_size` of 0 is treated as 1
    pub fn new(sink: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            persisted: 0,
            flushes: 0,
            closed: false,
        }
    }

    /// Prepares the sink so the output file exists from the start of the run
    pub fn initialize(&mut self) -> StorageResult<()> {
        self.sink.initialize()
    }

    /// Buffers a record, flushing once the batch is full
    ///
    /// # Returns
    ///
    /// * `Ok(Some(n))` - The append triggered a flush of `n` records
    /// * `Ok(None)` - The record was buffered
    /// * `Err(StorageError)` - The triggered flush failed on every destination
    pub fn append(&mut self, record: EnrichedRecord) -> StorageResult<Option<usize>> {
        if self.closed {
            return Err(StorageError::Closed);
        }

        tracing::trace!("Buffered record {}", record.id());
        self.batch.push(record);

        if self.batch.len() >= self.batch_size {
            self.flush().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Writes all buffered records to the sink
    ///
    /// Returns the number of records written; an empty batch is a no-op.
    pub fn flush(&mut self) -> StorageResult<usize> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        let count = self.batch.len();
        match self.sink.write_batch(&self.batch) {
            Ok(()) => {
                self.batch.clear();
                self.persisted += count;
                self.flushes += 1;
                tracing::info!(
                    "Flushed {} records to {} ({} total)",
                    count,
                    self.sink.location().display(),
                    self.persisted
                );
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Flush of {} records failed: {}", count, e);
                Err(e)
            }
        }
    }

    /// Flushes what is left and refuses further appends
    pub fn close(&mut self) -> StorageResult<WriterStats> {
        if !self.closed {
            self.flush()?;
            self.closed = true;
        }
        Ok(self.stats())
    }

    pub fn stats(&self) -> WriterStats {
        WriterStats {
            persisted: self.persisted,
            flushes: self.flushes,
            location: self.sink.location().to_path_buf(),
        }
    }

    /// Records written so far
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
