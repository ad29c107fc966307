//! Storage module for persisting extracted records
//!
//! This module handles all durable output for a run, including:
//! - The fixed CSV column layout
//! - Append-only CSV files with a fallback destination
//! - Batching records in memory and flushing them in fixed-size batches

mod csv_sink;
pub mod schema;
mod traits;
mod writer;

pub use csv_sink::{run_file_name, CsvSink};
pub use schema::Schema;
pub use traits::{RecordSink, StorageError, StorageResult};
pub use writer::{IncrementalWriter, WriterStats};

/// Writer type used by the pipeline
pub type CsvWriter = IncrementalWriter<CsvSink>;
