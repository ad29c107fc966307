//! Extracted record types
//!
//! Every field that the remote markup may omit is an `Option<String>`. An
//! absent element and an element with only whitespace both become `None`;
//! an empty string is never stored.

use crate::state::SearchDimension;

/// One listing card from a search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// Identifier derived from the canonical URL
    pub id: String,

    pub title: Option<String>,

    /// Hiring organization name
    pub company: Option<String>,

    pub location: Option<String>,

    /// ISO-8601 date from the card's `<time datetime>` attribute
    pub posted_at: Option<String>,

    /// Canonical URL with the query string stripped
    pub url: String,
}

/// Enrichment parsed from a detail document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRecord {
    pub experience_level: Option<String>,
    pub employment_type: Option<String>,
    pub job_function: Option<String>,
    pub industries: Option<String>,
    pub salary: Option<String>,

    /// Skill names in document order
    pub skills: Vec<String>,

    pub description: Option<String>,
    pub company_size: Option<String>,
    pub company_industry: Option<String>,
    pub applicant_count: Option<String>,
}

impl DetailRecord {
    /// Skills as a single delimited cell, `None` when no skills were found
    pub fn skills_text(&self) -> Option<String> {
        if self.skills.is_empty() {
            None
        } else {
            Some(self.skills.join(", "))
        }
    }

    /// Returns true if no field was extracted
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A listing joined with its detail enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub listing: ListingRecord,
    pub detail: DetailRecord,

    /// Dimension the listing was found under, for tagged runs
    pub dimension: Option<SearchDimension>,
}

impl EnrichedRecord {
    pub fn new(
        listing: ListingRecord,
        detail: DetailRecord,
        dimension: Option<SearchDimension>,
    ) -> Self {
        Self {
            listing,
            detail,
            dimension,
        }
    }

    pub fn id(&self) -> &str {
        &self.listing.id
    }
}

/// Trims a text value, mapping whitespace-only input to `None`
pub fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
