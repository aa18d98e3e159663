//! Backup and rolling-window pruning for spreadsheet-style tracking documents.
//!
//! Once a month every configured document is copied to an archive location,
//! the copy is linked from the document's `ArchiveLogs` sheet, and rows dated
//! more than `retention.months` calendar months ago are removed from each
//! configured sheet.

pub mod archive;
pub mod config;
pub mod observability;
pub mod retention;
pub mod schedule;
pub mod storage;
pub mod table;

#[cfg(test)]
mod tests;
