//! Run report accumulated by the orchestrator
//!
//! This module provides the counters a run collects and the summary the
//! CLI prints once the run is over.

use std::fmt::Write as _;
use std::path::PathBuf;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Listing pages that came back with a 2xx status
    pub pages_fetched: u64,

    /// Listing pages skipped after an error status or transport failure
    pub pages_failed: u64,

    /// HTTP 429 responses, listing and detail combined
    pub rate_limited: u64,

    /// Listing records extracted from cards
    pub listings_extracted: u64,

    /// Cards dropped for lack of a usable link
    pub fragments_rejected: u64,

    /// Detail documents that could not be fetched
    pub details_failed: u64,

    /// Records written to the output file
    pub records_persisted: u64,

    /// Successful non-empty flushes
    pub flushes: u64,

    pub dimensions_exhausted: u32,
    pub dimensions_aborted: u32,

    /// Final output file, after any fallback
    pub output_path: Option<PathBuf>,

    /// The run stopped early on a cancellation request
    pub cancelled: bool,
}

impl RunReport {
    /// Renders the report as an indented, human-readable block
    pub fn render(&self) -> String {
        let mut out = String::new();

        let heading = if self.cancelled {
            "=== Harvest Interrupted ==="
        } else {
            "=== Harvest Complete ==="
        };
        let _ = writeln!(out, "{}\n", heading);

        let _ = writeln!(out, "Pages:");
        let _ = writeln!(out, "  Fetched: {}", self.pages_fetched);
        let _ = writeln!(out, "  Failed: {}", self.pages_failed);
        let _ = writeln!(out, "  Rate limited responses: {}", self.rate_limited);
        let _ = writeln!(out);

        let _ = writeln!(out, "Listings:");
        let _ = writeln!(out, "  Extracted: {}", self.listings_extracted);
        let _ = writeln!(out, "  Rejected cards: {}", self.fragments_rejected);
        let _ = writeln!(out, "  Details failed: {}", self.details_failed);
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "Dimensions: {} exhausted, {} aborted",
            self.dimensions_exhausted, self.dimensions_aborted
        );
        let _ = writeln!(
            out,
            "Persisted {} records in {} flushes",
            self.records_persisted, self.flushes
        );

        match &self.output_path {
            Some(path) => {
                let _ = writeln!(out, "Output: {}", path.display());
            }
            None => {
                let _ = writeln!(out, "Output: (none)");
            }
        }

        out
    }
}

/// Prints the report to stdout
pub fn print_report(report: &RunReport) {
    print!("{}", report.render());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_complete_run() {
        let report = RunReport {
            pages_fetched: 2,
            listings_extracted: 25,
            records_persisted: 25,
            flushes: 1,
            dimensions_exhausted: 1,
            output_path: Some(PathBuf::from("data/listings_20240115_093000.csv")),
            ..Default::default()
        };

        let text = report.render();
        assert!(text.starts_with("=== Harvest Complete ==="));
        assert!(text.contains("Fetched: 2"));
        assert!(text.contains("Persisted 25 records in 1 flushes"));
        assert!(text.contains("Output: data/listings_20240115_093000.csv"));
    }

    #[test]
    fn test_render_interrupted_run() {
        let report = RunReport {
            cancelled: true,
            ..Default::default()
        };

        let text = report.render();
        assert!(text.starts_with("=== Harvest Interrupted ==="));
        assert!(text.contains("Output: (none)"));
    }
}
