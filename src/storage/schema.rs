//! CSV column layout
//!
//! The column order is fixed. Runs that iterate search dimensions append two
//! tag columns; single-dimension runs do not.

use crate::record::EnrichedRecord;

/// Columns shared by every run, in output order
pub const BASE_COLUMNS: [&str; 16] = [
    "job_id",
    "title",
    "company",
    "location",
    "experience_level",
    "employment_type",
    "posted_date",
    "job_function",
    "industries",
    "salary",
    "required_skills",
    "description",
    "company_size",
    "company_industry",
    "applicant_count",
    "job_url",
];

/// Columns identifying the search dimension a record came from
pub const TAG_COLUMNS: [&str; 2] = ["sort_method", "time_filter"];

/// Column layout of one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Base columns only
    Plain,

    /// Base columns followed by the dimension tag columns
    Tagged,
}

impl Schema {
    /// Header row
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = BASE_COLUMNS.to_vec();
        if *self == Self::Tagged {
            columns.extend_from_slice(&TAG_COLUMNS);
        }
        columns
    }

    /// Renders one record; absent fields become empty cells
    pub fn row(&self, record: &EnrichedRecord) -> Vec<String> {
        let listing = &record.listing;
        let detail = &record.detail;

        let cells = [
            Some(listing.id.clone()),
            listing.title.clone(),
            listing.company.clone(),
            listing.location.clone(),
            detail.experience_level.clone(),
            detail.employment_type.clone(),
            listing.posted_at.clone(),
            detail.job_function.clone(),
            detail.industries.clone(),
            detail.salary.clone(),
            detail.skills_text(),
            detail.description.clone(),
            detail.company_size.clone(),
            detail.company_industry.clone(),
            detail.applicant_count.clone(),
            Some(listing.url.clone()),
        ];

        let mut row: Vec<String> = cells.into_iter().map(Option::unwrap_or_default).collect();

        if *self == Self::Tagged {
            match record.dimension {
                Some(dimension) => {
                    row.push(dimension.sort.tag().to_string());
                    row.push(dimension.recency.tag().to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }

        row
    }
}
