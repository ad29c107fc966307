//! Search dimension definitions
//!
//! A search dimension is one (sort order, recency filter) combination. Each
//! dimension drives its own independent pagination sequence.

use std::fmt;

/// Ordering requested from the listing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Most relevant first
    Relevance,

    /// Most recently posted first
    Recency,

    /// Most applied-to first
    AppliedCount,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [Self::Relevance, Self::Recency, Self::AppliedCount];

    /// Value of the `sortBy` query parameter
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Relevance => "R",
            Self::Recency => "DD",
            Self::AppliedCount => "A",
        }
    }

    /// Tag written to the `sort_method` column
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Relevance => "relevant",
            Self::Recency => "recent",
            Self::AppliedCount => "applied",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sort| sort.tag() == s)
    }
}

/// Posting-age window requested from the listing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecencyFilter {
    Last24Hours,
    LastWeek,
    LastMonth,
    /// No time filter at all
    Unbounded,
}

impl RecencyFilter {
    pub const ALL: [RecencyFilter; 4] = [
        Self::Last24Hours,
        Self::LastWeek,
        Self::LastMonth,
        Self::Unbounded,
    ];

    /// Value of the `f_TPR` query parameter, or `None` when the parameter is omitted
    pub fn wire_code(&self) -> Option<&'static str> {
        match self {
            Self::Last24Hours => Some("1"),
            Self::LastWeek => Some("1,2,3,4,5,6,7"),
            Self::LastMonth => Some("1,2,3,4"),
            Self::Unbounded => None,
        }
    }

    /// Tag written to the `time_filter` column
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::LastWeek => "week",
            Self::LastMonth => "month",
            Self::Unbounded => "any",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|recency| recency.tag() == s)
    }
}

/// One immutable (sort, recency) combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchDimension {
    pub sort: SortOrder,
    pub recency: RecencyFilter,
}

impl SearchDimension {
    pub fn new(sort: SortOrder, recency: RecencyFilter) -> Self {
        Self { sort, recency }
    }

    /// Placeholder dimension for the simple and exhaustive modes
    ///
    /// Those runs send no `sortBy` or `f_TPR` parameter at all; the query's
    /// `filtered` flag decides that, not this value.
    pub fn unfiltered() -> Self {
        Self::new(SortOrder::Relevance, RecencyFilter::Unbounded)
    }

    /// Full Cartesian product, sort-major
    pub fn all() -> Vec<SearchDimension> {
        SortOrder::ALL
            .into_iter()
            .flat_map(|sort| {
                RecencyFilter::ALL
                    .into_iter()
                    .map(move |recency| SearchDimension::new(sort, recency))
            })
            .collect()
    }
}

impl fmt::Display for SearchDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort={} filter={}", self.sort.tag(), self.recency.tag())
    }
}
