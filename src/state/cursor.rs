/// Pagination cursor and per-dimension status
///
/// This module defines the pointer into one dimension's page sequence and the
/// states that sequence moves through.
use crate::state::SearchDimension;
use std::fmt;

/// Position in one dimension's page sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCursor {
    pub dimension: SearchDimension,

    /// Zero-based page index
    pub page_index: u32,
}

impl PageCursor {
    pub fn new(dimension: SearchDimension, page_index: u32) -> Self {
        Self {
            dimension,
            page_index,
        }
    }

    /// Value of the `start` query parameter for this page
    pub fn start_offset(&self, page_size: u32) -> u64 {
        self.page_index as u64 * page_size as u64
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] page {}", self.dimension, self.page_index)
    }
}

/// Lifecycle of a single dimension's pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionStatus {
    /// Next fetch targets this page index
    Fetching(u32),

    /// The remote result set ran out, or the page budget was used up
    Exhausted,

    /// Gave up: too many failed pages in a row, or cancelled
    Aborted,
}

impl DimensionStatus {
    /// Returns true once no further fetches will be issued
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fetching(_))
    }
}
