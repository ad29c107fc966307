//! Output module for run summaries
//!
//! This module handles:
//! - Accumulating the counters of one run
//! - Printing the end-of-run summary

pub mod stats;

pub use stats::{print_report, RunReport};
