//! Pagination controller for one search dimension
//!
//! The controller is a pure state machine: the orchestrator asks it for the
//! next cursor, performs the fetch, and reports back what happened.
//!
//! # Transitions
//!
//! | Outcome | Fixed budget | Until-empty budget |
//! |---------|--------------|--------------------|
//! | Non-empty page | advance; last page → Exhausted | advance, reset empty count |
//! | Empty page | Exhausted | advance; `max_empty_pages` in a row → Exhausted |
//! | HTTP 429 | stay on page | stay on page |
//! | Failed fetch | advance; `max_failed_pages` in a row → Aborted | same |
//! | Cancelled | Aborted | Aborted |

use crate::state::{DimensionStatus, PageCursor, SearchDimension};

/// How many pages a dimension may fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBudget {
    /// A fixed number of pages derived from a listing quota
    Fixed { pages: u32 },

    /// Keep going until this many consecutive pages come back empty
    UntilEmpty { max_empty_pages: u32 },
}

impl PageBudget {
    /// Budget covering `quota` listings: `ceil(quota / page_size)` pages
    pub fn for_quota(quota: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self::Fixed {
            pages: quota.div_ceil(page_size),
        }
    }
}

/// What one page fetch produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page parsed and held this many listing fragments
    Listings(usize),

    /// The service answered 429; the same page must be retried
    RateLimited,

    /// Non-429 error status or transport failure
    Failed,
}

/// Drives one dimension's page sequence
#[derive(Debug, Clone)]
pub struct PaginationController {
    dimension: SearchDimension,
    budget: PageBudget,
    status: DimensionStatus,
    consecutive_empty: u32,
    consecutive_failed: u32,
    max_failed_pages: u32,
}

impl PaginationController {
    pub fn new(dimension: SearchDimension, budget: PageBudget, max_failed_pages: u32) -> Self {
        let status = match budget {
            PageBudget::Fixed { pages: 0 } => DimensionStatus::Exhausted,
            _ => DimensionStatus::Fetching(0),
        };

        Self {
            dimension,
            budget,
            status,
            consecutive_empty: 0,
            consecutive_failed: 0,
            max_failed_pages: max_failed_pages.max(1),
        }
    }

    pub fn dimension(&self) -> SearchDimension {
        self.dimension
    }

    pub fn status(&self) -> DimensionStatus {
        self.status
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// The page to fetch next, or `None` once the dimension is finished
    pub fn next_cursor(&self) -> Option<PageCursor> {
        match self.status {
            DimensionStatus::Fetching(page_index) => {
                Some(PageCursor::new(self.dimension, page_index))
            }
            _ => None,
        }
    }

    /// Applies the outcome of fetching the current cursor
    pub fn record(&mut self, outcome: PageOutcome) -> DimensionStatus {
        let page_index = match self.status {
            DimensionStatus::Fetching(page_index) => page_index,
            terminal => return terminal,
        };

        self.status = match outcome {
            PageOutcome::RateLimited => DimensionStatus::Fetching(page_index),

            PageOutcome::Listings(0) => {
                self.consecutive_failed = 0;
                match self.budget {
                    PageBudget::Fixed { .. } => DimensionStatus::Exhausted,
                    PageBudget::UntilEmpty { max_empty_pages } => {
                        self.consecutive_empty += 1;
                        if self.consecutive_empty >= max_empty_pages {
                            DimensionStatus::Exhausted
                        } else {
                            self.advance(page_index)
                        }
                    }
                }
            }

            PageOutcome::Listings(_) => {
                self.consecutive_empty = 0;
                self.consecutive_failed = 0;
                self.advance(page_index)
            }

            PageOutcome::Failed => {
                self.consecutive_failed += 1;
                if self.consecutive_failed >= self.max_failed_pages {
                    DimensionStatus::Aborted
                } else {
                    self.advance(page_index)
                }
            }
        };

        self.status
    }

    /// Stops the dimension, e.g. on cancellation
    pub fn abort(&mut self) {
        if !self.status.is_terminal() {
            self.status = DimensionStatus::Aborted;
        }
    }

    fn advance(&self, page_index: u32) -> DimensionStatus {
        let next = page_index + 1;
        match self.budget {
            PageBudget::Fixed { pages } if next >= pages => DimensionStatus::Exhausted,
            _ => DimensionStatus::Fetching(next),
        }
    }
}
