//! URL handling module for Listing-Harvest
//!
//! This module builds listing-search and detail URLs from the configured
//! endpoints and derives listing identifiers from canonical links.

mod endpoints;
mod identifier;

// Re-export main functions
pub use endpoints::{Endpoints, SearchQuery};
pub use identifier::{canonical_url, derive_identifier};
