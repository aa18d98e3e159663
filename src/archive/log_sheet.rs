//! The `ArchiveLogs` sheet kept inside every processed document.

use chrono::NaiveDateTime;
use tracing::info;
use url::Url;

use crate::{
    storage::{Document, StorageResult},
    table::{Cell, Row},
};

pub const ARCHIVE_LOG_SHEET: &str = "ArchiveLogs";

pub const ARCHIVE_LOG_HEADER: [&str; 2] = ["Date & Time", "File Copy & Link"];

/// Name of the backup taken at `now`, e.g. `2024.09.01 01.00 Backup of Empalme`.
pub fn backup_name(now: NaiveDateTime, document_name: &str) -> String {
    format!("{} Backup of {}", now.format("%Y.%m.%d %H.%M"), document_name)
}

/// Spreadsheet formula linking to `url` with `label` as its text.
pub fn hyperlink_formula(url: &Url, label: &str) -> String {
    format!(
        "=HYPERLINK(\"{}\", \"{}\")",
        url.as_str().replace('"', "\"\""),
        label.replace('"', "\"\"")
    )
}

/// The row appended for one backup.
pub fn log_row(now: NaiveDateTime, url: &Url, backup_name: &str) -> Row {
    vec![
        Cell::from(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        Cell::from(hyperlink_formula(url, backup_name)),
    ]
}

/// Append a backup entry to the document's log sheet, creating it first if needed.
///
/// Returns true when the sheet had to be created.
pub async fn record_backup(
    document: &dyn Document,
    now: NaiveDateTime,
    url: &Url,
    backup_name: &str,
) -> StorageResult<bool> {
    let created = if document.has_sheet(ARCHIVE_LOG_SHEET).await? {
        false
    } else {
        document.create_sheet(ARCHIVE_LOG_SHEET).await?;
        document
            .append_row(
                ARCHIVE_LOG_SHEET,
                ARCHIVE_LOG_HEADER.iter().map(|h| Cell::from(*h)).collect(),
            )
            .await?;
        info!(sheet = ARCHIVE_LOG_SHEET, "Created archive log sheet");
        true
    };

    document
        .append_row(ARCHIVE_LOG_SHEET, log_row(now, url, backup_name))
        .await?;

    Ok(created)
}
