//! Output module for end-of-run reporting
//!
//! This module handles:
//! - Aggregating worker reports and download counters into a run summary
//! - Printing the summary at teardown

mod summary;

pub use summary::{print_summary, RunSummary};
