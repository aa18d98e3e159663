//! Monthly archive runs.
//!
//! For each configured document, in order:
//!
//! 1. back the document up through the [`BackupTarget`]
//! 2. append a link to the backup in the document's `ArchiveLogs` sheet
//! 3. prune every configured sheet of rows older than the cutoff
//!
//! A failure in any step ends processing of that document only; the run
//! moves on to the next one. Nothing is rolled back. Dry runs skip steps 1
//! and 2 and leave every sheet untouched.

mod error;
mod log_sheet;
mod report;

use std::sync::Arc;

use chrono::NaiveDateTime;
pub use error::{ArchiveError, ArchiveResult};
pub use log_sheet::{
    ARCHIVE_LOG_HEADER, ARCHIVE_LOG_SHEET, backup_name, hyperlink_formula, log_row,
    record_backup,
};
pub use report::{DocumentOutcome, DocumentReport, RunReport, SheetOutcome, SheetReport};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    config::{DocumentConfig, RetentionConfig, SheetConfig},
    retention::{RetentionScanner, ScanPolicy, cutoff_for},
    storage::{BackupTarget, Document, DocumentStore, StorageResult},
};

/// Runs backups and retention over a set of documents.
pub struct Archiver {
    store: Arc<dyn DocumentStore>,
    backup: Arc<dyn BackupTarget>,
    retention: RetentionConfig,
    scanner: RetentionScanner,
}

impl Archiver {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backup: Arc<dyn BackupTarget>,
        retention: RetentionConfig,
    ) -> Self {
        let scanner = RetentionScanner::new(retention.date_parser());
        Self {
            store,
            backup,
            retention,
            scanner,
        }
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.retention
    }

    /// Process every document, continuing past per-document failures.
    pub async fn run(&self, documents: &[DocumentConfig], now: NaiveDateTime) -> RunReport {
        let cutoff = cutoff_for(now, self.retention.months);
        let dry_run = self.retention.dry_run;
        let dry_run_msg = if dry_run { " (DRY RUN)" } else { "" };

        info!(
            documents = documents.len(),
            months = self.retention.months,
            cutoff = %cutoff,
            dry_run,
            store = self.store.backend_name(),
            backup = self.backup.backend_name(),
            "Starting archive run{}",
            dry_run_msg
        );

        let mut report = RunReport::new(now, cutoff, dry_run);

        for document in documents {
            let span = info_span!("document", document_id = %document.id);
            let outcome = match self
                .process_document(document, now, cutoff)
                .instrument(span)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(document_id = %document.id, error = %e, "Error processing document");
                    DocumentOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.documents.push(DocumentReport {
                document_id: document.id.clone(),
                outcome,
            });
        }

        info!(
            documents = report.documents.len(),
            failed = report.failed_documents(),
            rows_found = report.rows_found(),
            rows_deleted = report.rows_deleted(),
            rows_trimmed = report.rows_trimmed(),
            sheets_missing = report.sheets_missing(),
            dry_run,
            "Archive run completed{}",
            dry_run_msg
        );

        report
    }

    async fn process_document(
        &self,
        config: &DocumentConfig,
        now: NaiveDateTime,
        cutoff: NaiveDateTime,
    ) -> ArchiveResult<DocumentOutcome> {
        let document = self
            .store
            .open(&config.id)
            .await
            .map_err(ArchiveError::Open)?;

        info!(name = document.name(), "Processing document");

        let backup = if self.retention.dry_run {
            info!("DRY RUN: Skipping backup and archive log");
            None
        } else {
            let name = backup_name(now, document.name());
            let url = self
                .backup
                .backup(document.id(), &name)
                .await
                .map_err(ArchiveError::Backup)?;
            info!(backup = %name, url = %url, "Backup created");

            record_backup(document.as_ref(), now, &url, &name)
                .await
                .map_err(ArchiveError::Log)?;
            debug!(sheet = ARCHIVE_LOG_SHEET, "Archive log updated");
            Some(url)
        };

        let mut sheets = Vec::with_capacity(config.sheets.len());
        for sheet in &config.sheets {
            let outcome = self
                .process_sheet(document.as_ref(), sheet, cutoff)
                .await
                .map_err(|source| ArchiveError::Sheet {
                    sheet: sheet.name.clone(),
                    source,
                })?;
            sheets.push(SheetReport {
                sheet: sheet.name.clone(),
                outcome,
            });
        }

        Ok(DocumentOutcome::Completed { backup, sheets })
    }

    async fn process_sheet(
        &self,
        document: &dyn Document,
        sheet: &SheetConfig,
        cutoff: NaiveDateTime,
    ) -> StorageResult<SheetOutcome> {
        if !document.has_sheet(&sheet.name).await? {
            warn!(sheet = %sheet.name, "Sheet not found, skipping");
            return Ok(SheetOutcome::Missing);
        }

        let table = document.read_sheet(&sheet.name).await?;
        let policy = ScanPolicy {
            date_column: sheet.date_column,
            cutoff,
        };
        let scan = self.scanner.scan(&table, &policy);

        info!(
            sheet = %sheet.name,
            rows = table.len(),
            found = scan.len(),
            "Found {} rows older than {}",
            scan.len(),
            cutoff.date()
        );
        if !scan.is_empty() {
            debug!(sheet = %sheet.name, rows = ?scan.rows(), "Rows marked for deletion");
        }
        if scan.section_start().is_none() {
            debug!(sheet = %sheet.name, "No dated rows");
        }

        if self.retention.dry_run {
            info!(
                sheet = %sheet.name,
                rows = ?scan.rows(),
                "DRY RUN: Would delete {} rows",
                scan.len()
            );
            return Ok(SheetOutcome::Processed {
                rows_found: scan.len(),
                rows_deleted: 0,
                rows_trimmed: 0,
            });
        }

        let mut pruned = table.without_rows(&scan);
        let rows_trimmed = if self.retention.trim_trailing_empty_rows {
            pruned.trim_trailing_empty_rows()
        } else {
            0
        };

        if scan.is_empty() && rows_trimmed == 0 {
            return Ok(SheetOutcome::Processed {
                rows_found: 0,
                rows_deleted: 0,
                rows_trimmed: 0,
            });
        }

        document.write_sheet(&sheet.name, &pruned).await?;
        info!(
            sheet = %sheet.name,
            deleted = scan.len(),
            trimmed = rows_trimmed,
            remaining = pruned.len(),
            "Sheet pruned"
        );

        Ok(SheetOutcome::Processed {
            rows_found: scan.len(),
            rows_deleted: scan.len(),
            rows_trimmed,
        })
    }
}
