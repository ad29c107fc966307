//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `SearchDimension`: one (sort order, recency filter) combination
//! - `PageCursor`: the pointer into one dimension's page sequence
//! - `DimensionStatus`: fetching, exhausted, or aborted

mod cursor;
mod dimension;

// Re-export main types
pub use cursor::{DimensionStatus, PageCursor};
pub use dimension::{RecencyFilter, SearchDimension, SortOrder};
