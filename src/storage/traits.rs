//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and associated
//! error types.

use crate::record::EnrichedRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Writing to {primary} failed ({primary_error}) and no fallback destination is available")]
    NoFallback {
        primary: PathBuf,
        primary_error: String,
    },

    #[error("Writing to {primary} failed ({primary_error}); fallback {fallback} failed too ({fallback_error})")]
    DestinationsExhausted {
        primary: PathBuf,
        primary_error: String,
        fallback: PathBuf,
        fallback_error: String,
    },

    #[error("Writer already closed")]
    Closed,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for flushed batches
///
/// A sink only ever appends. Implementations must not rewrite or re-read
/// rows written by earlier calls.
pub trait RecordSink: Send {
    /// Prepares the destination (e.g. writes a header) before any batch arrives
    fn initialize(&mut self) -> StorageResult<()> {
        Ok(())
    }

    /// Appends one batch of records
    fn write_batch(&mut self, records: &[EnrichedRecord]) -> StorageResult<()>;

    /// Where records currently land
    fn location(&self) -> &Path;
}
