//! Append-only CSV destination with a fallback location

use crate::config::OutputConfig;
use crate::record::EnrichedRecord;
use crate::storage::schema::Schema;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Builds the run-timestamped file name, e.g. `listings_20240115_093000.csv`
pub fn run_file_name(started: DateTime<Local>) -> String {
    format!("listings_{}.csv", started.format("%Y%m%d_%H%M%S"))
}

/// CSV file that only ever grows
///
/// The header row is written when the file is empty at open time, so it
/// appears once no matter how many batches follow. If the primary directory
/// cannot be written, the batch is retried once in the fallback directory and
/// every later batch goes there too.
pub struct CsvSink {
    schema: Schema,
    file_name: String,
    primary: PathBuf,
    fallback: Option<PathBuf>,
    on_fallback: bool,
}

impl CsvSink {
    /// Creates a sink; no file is touched until the first write
    pub fn new(
        schema: Schema,
        primary_dir: impl Into<PathBuf>,
        fallback_dir: Option<PathBuf>,
        file_name: impl Into<String>,
    ) -> Self {
        let file_name = file_name.into();
        let primary = primary_dir.into().join(&file_name);
        let fallback = fallback_dir.map(|dir| dir.join(&file_name));

        Self {
            schema,
            file_name,
            primary,
            fallback,
            on_fallback: false,
        }
    }

    /// Creates the sink for one run from the output configuration
    ///
    /// Without a configured fallback directory the user's home directory is
    /// used, when one can be determined.
    pub fn for_run(schema: Schema, config: &OutputConfig, started: DateTime<Local>) -> Self {
        let fallback_dir = config
            .fallback_directory
            .as_ref()
            .map(PathBuf::from)
            .or_else(dirs::home_dir);

        Self::new(
            schema,
            PathBuf::from(&config.directory),
            fallback_dir,
            run_file_name(started),
        )
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Returns true once writes have moved to the fallback location
    pub fn is_on_fallback(&self) -> bool {
        self.on_fallback
    }

    fn append_rows(&self, path: &Path, records: &[EnrichedRecord]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(self.schema.columns())?;
        }

        for record in records {
            writer.write_record(self.schema.row(record))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_with_fallback(&mut self, records: &[EnrichedRecord]) -> StorageResult<()> {
        if self.on_fallback {
            let fallback = self.fallback.clone().unwrap_or_else(|| self.primary.clone());
            return self.append_rows(&fallback, records);
        }

        let primary_error = match self.append_rows(&self.primary, records) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        tracing::error!(
            "Failed to write {} records to {}: {}",
            records.len(),
            self.primary.display(),
            primary_error
        );

        let fallback = match self.fallback.clone() {
            Some(path) => path,
            None => {
                return Err(StorageError::NoFallback {
                    primary: self.primary.clone(),
                    primary_error: primary_error.to_string(),
                })
            }
        };

        match self.append_rows(&fallback, records) {
            Ok(()) => {
                tracing::warn!(
                    "Switched output to fallback location {}",
                    fallback.display()
                );
                self.on_fallback = true;
                Ok(())
            }
            Err(fallback_error) => Err(StorageError::DestinationsExhausted {
                primary: self.primary.clone(),
                primary_error: primary_error.to_string(),
                fallback,
                fallback_error: fallback_error.to_string(),
            }),
        }
    }
}

impl RecordSink for CsvSink {
    fn initialize(&mut self) -> StorageResult<()> {
        self.write_with_fallback(&[])
    }

    fn write_batch(&mut self, records: &[EnrichedRecord]) -> StorageResult<()> {
        self.write_with_fallback(records)
    }

    fn location(&self) -> &Path {
        match (&self.fallback, self.on_fallback) {
            (Some(fallback), true) => fallback.as_path(),
            _ => self.primary.as_path(),
        }
    }
}
