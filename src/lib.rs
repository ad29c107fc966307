//! Listing-Harvest: a polite, incremental listing scraper
//!
//! This crate pages through a rate-limited HTML job-listing service, extracts
//! typed records from each listing card and its detail document, and appends
//! them to a CSV file in fixed-size batches so an interrupted run keeps
//! everything it already flushed.

pub mod config;
pub mod crawler;
pub mod logging;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Endpoint cannot carry a path segment: {0}")]
    NotABase(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Harvester, RunMode};
pub use record::{DetailRecord, EnrichedRecord, ListingRecord};
pub use state::{DimensionStatus, PageCursor, RecencyFilter, SearchDimension, SortOrder};
pub use crate::url::derive_identifier;
