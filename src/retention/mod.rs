//! Row retention for dated sheets.
//!
//! This module decides which rows of a sheet have aged out of the rolling
//! retention window:
//! 1. [`cutoff_for`] turns the run time into the earliest date to keep
//! 2. [`RetentionScanner`] walks a table and marks older rows for deletion
//!
//! Applying the result is left to the caller, see
//! [`Table::without_rows`](crate::table::Table::without_rows).

mod cutoff;
mod scanner;

pub use cutoff::cutoff_for;
pub use scanner::{RetentionScanner, ScanPolicy, ScanResult};
