//! End-to-end archive runs against the filesystem backend.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use url::Url;

use crate::{
    archive::{ARCHIVE_LOG_SHEET, Archiver, DocumentOutcome, SheetOutcome},
    config::{DocumentConfig, RetentionConfig, SheetConfig},
    storage::{
        BackupTarget, Document, DocumentStore, FilesystemBackup, FilesystemDocumentStore,
        StorageError, StorageResult,
    },
    table::{Cell, Table},
};

const EXPO: &str = "\
TE Tracker Empalme,
Fecha,Cliente
01/15/2024,Acme
02/20/2024,Beta
,
06/15/2024,Gamma
08/30/2024,Delta
,
,
";

const IMPO: &str = "Fecha,Cliente\n";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 1)
        .unwrap()
        .and_hms_opt(1, 0, 0)
        .unwrap()
}

fn sheet(name: &str) -> SheetConfig {
    SheetConfig {
        name: name.to_string(),
        date_column: 0,
    }
}

fn document(id: &str, sheets: &[&str]) -> DocumentConfig {
    DocumentConfig {
        id: id.to_string(),
        description: None,
        sheets: sheets.iter().map(|s| sheet(s)).collect(),
    }
}

struct Fixture {
    dir: TempDir,
    store: Arc<FilesystemDocumentStore>,
    backup: Arc<FilesystemBackup>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("docs/empalme");
        std::fs::create_dir_all(&doc).unwrap();
        std::fs::write(doc.join("EXPO.csv"), EXPO).unwrap();
        std::fs::write(doc.join("IMPO.csv"), IMPO).unwrap();

        let store = Arc::new(FilesystemDocumentStore::new(dir.path().join("docs")));
        let backup = Arc::new(
            FilesystemBackup::new(dir.path().join("docs"), dir.path().join("archive"), true)
                .unwrap(),
        );
        Self { dir, store, backup }
    }

    fn archiver(&self, retention: RetentionConfig) -> Archiver {
        Archiver::new(self.store.clone(), self.backup.clone(), retention)
    }

    fn archive_dir(&self) -> &Path {
        self.backup.archive_dir()
    }

    fn sheet_text(&self, sheet: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(format!("docs/empalme/{sheet}.csv")))
            .unwrap()
    }

    async fn read(&self, sheet: &str) -> Table {
        let doc = self.store.open("empalme").await.unwrap();
        doc.read_sheet(sheet).await.unwrap()
    }
}

fn first_column(table: &Table) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|row| row.first().map(ToString::to_string).unwrap_or_default())
        .collect()
}

/// Backup target that always fails.
struct FailingBackup;

#[async_trait]
impl BackupTarget for FailingBackup {
    async fn backup(&self, _document_id: &str, _backup_name: &str) -> StorageResult<Url> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn test_run_backs_up_logs_and_prunes() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig::default());

    let report = archiver
        .run(&[document("empalme", &["EXPO", "IMPO"])], now())
        .await;

    assert!(!report.has_failures());
    assert_eq!(
        report.cutoff,
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
    );

    // Backup holds the document as it was before pruning
    let backup_dir = fx.archive_dir().join("2024.09.01 01.00 Backup of empalme");
    assert_eq!(
        std::fs::read_to_string(backup_dir.join("EXPO.csv")).unwrap(),
        EXPO
    );
    assert!(backup_dir.join("IMPO.csv").is_file());

    let doc_report = report.document("empalme").unwrap();
    let url = doc_report.backup().unwrap();
    assert_eq!(
        url.to_file_path().unwrap(),
        std::fs::canonicalize(&backup_dir).unwrap()
    );

    // Archive log was created with a header and one entry
    let log = fx.read(ARCHIVE_LOG_SHEET).await;
    assert_eq!(log.len(), 2);
    assert_eq!(log.cell(1, 0), Some(&Cell::from("Date & Time")));
    assert_eq!(log.cell(2, 0), Some(&Cell::from("2024-09-01 01:00:00")));
    assert_eq!(
        log.cell(2, 1),
        Some(&Cell::from(format!(
            "=HYPERLINK(\"{}\", \"2024.09.01 01.00 Backup of empalme\")",
            url
        )))
    );

    // Row 4 (02/20/2024) is old; row 3 opens the dated section and stays.
    // The two trailing empty rows are trimmed, the middle one is kept.
    let expo = fx.read("EXPO").await;
    assert_eq!(
        first_column(&expo),
        vec![
            "TE Tracker Empalme",
            "Fecha",
            "01/15/2024",
            "",
            "06/15/2024",
            "08/30/2024"
        ]
    );
    assert_eq!(expo.cell(6, 1), Some(&Cell::from("Delta")));

    // Header-only sheet is left alone
    assert_eq!(fx.sheet_text("IMPO"), IMPO);

    assert_eq!(
        doc_report.sheets()[0].outcome,
        SheetOutcome::Processed {
            rows_found: 1,
            rows_deleted: 1,
            rows_trimmed: 2,
        }
    );
    assert_eq!(
        doc_report.sheets()[1].outcome,
        SheetOutcome::Processed {
            rows_found: 0,
            rows_deleted: 0,
            rows_trimmed: 0,
        }
    );
    assert_eq!(report.rows_deleted(), 1);
    assert_eq!(report.rows_trimmed(), 2);
}

#[tokio::test]
async fn test_missing_sheet_is_skipped() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig::default());

    let report = archiver
        .run(&[document("empalme", &["EXTRA", "EXPO"])], now())
        .await;

    assert!(!report.has_failures());
    assert_eq!(report.sheets_missing(), 1);
    assert_eq!(report.sheets_processed(), 1);
    assert_eq!(report.rows_deleted(), 1);
}

#[tokio::test]
async fn test_failing_document_does_not_stop_run() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig::default());

    let report = archiver
        .run(
            &[
                document("hermosillo", &["EXPO"]),
                document("empalme", &["EXPO"]),
            ],
            now(),
        )
        .await;

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.failed_documents(), 1);
    assert!(matches!(
        report.documents[0].outcome,
        DocumentOutcome::Failed { .. }
    ));
    assert!(!report.documents[1].is_failure());
    assert_eq!(report.rows_deleted(), 1);
}

#[tokio::test]
async fn test_backup_failure_leaves_document_untouched() {
    let fx = Fixture::new();
    let archiver = Archiver::new(
        fx.store.clone(),
        Arc::new(FailingBackup),
        RetentionConfig::default(),
    );

    let report = archiver.run(&[document("empalme", &["EXPO"])], now()).await;

    match &report.documents[0].outcome {
        DocumentOutcome::Failed { error } => assert!(error.contains("disk full")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fx.sheet_text("EXPO"), EXPO);
    let doc = fx.store.open("empalme").await.unwrap();
    assert!(!doc.has_sheet(ARCHIVE_LOG_SHEET).await.unwrap());
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig {
        dry_run: true,
        ..Default::default()
    });

    let report = archiver.run(&[document("empalme", &["EXPO"])], now()).await;

    assert!(report.dry_run);
    assert!(!report.has_failures());
    assert_eq!(report.rows_found(), 1);
    assert_eq!(report.rows_deleted(), 0);
    assert!(report.document("empalme").unwrap().backup().is_none());

    assert_eq!(fx.sheet_text("EXPO"), EXPO);
    assert_eq!(std::fs::read_dir(fx.archive_dir()).unwrap().count(), 0);
    let doc = fx.store.open("empalme").await.unwrap();
    assert!(!doc.has_sheet(ARCHIVE_LOG_SHEET).await.unwrap());
}

#[tokio::test]
async fn test_repeat_runs_append_to_log() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig::default());
    let docs = [document("empalme", &["EXPO"])];

    archiver.run(&docs, now()).await;

    // Same minute: the backup name collides and the document fails
    let again = archiver.run(&docs, now()).await;
    assert!(again.has_failures());

    let next_month = NaiveDate::from_ymd_opt(2024, 10, 1)
        .unwrap()
        .and_hms_opt(1, 0, 0)
        .unwrap();
    let report = archiver.run(&docs, next_month).await;
    assert!(!report.has_failures());

    let log = fx.read(ARCHIVE_LOG_SHEET).await;
    assert_eq!(
        first_column(&log),
        vec!["Date & Time", "2024-09-01 01:00:00", "2024-10-01 01:00:00"]
    );
    assert!(
        fx.archive_dir()
            .join("2024.10.01 01.00 Backup of empalme")
            .is_dir()
    );
}

#[tokio::test]
async fn test_trailing_rows_kept_when_trim_disabled() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig {
        trim_trailing_empty_rows: false,
        ..Default::default()
    });

    let report = archiver.run(&[document("empalme", &["EXPO"])], now()).await;

    assert_eq!(report.rows_trimmed(), 0);
    assert_eq!(fx.read("EXPO").await.len(), 8);
}

#[tokio::test]
async fn test_longer_retention_window() {
    let fx = Fixture::new();
    let archiver = fx.archiver(RetentionConfig {
        months: 12,
        ..Default::default()
    });

    let report = archiver.run(&[document("empalme", &["EXPO"])], now()).await;

    assert_eq!(report.rows_found(), 0);
    // Nothing deleted, but trailing empty rows are still trimmed
    assert_eq!(report.rows_trimmed(), 2);
    assert_eq!(fx.read("EXPO").await.len(), 7);
}

#[tokio::test]
async fn test_interior_blank_line_survives_prune() {
    let fx = Fixture::new();
    std::fs::write(
        fx.dir.path().join("docs/empalme/EXPO.csv"),
        "Fecha\n01/01/2020\n02/02/2020\n\n06/15/2024\n",
    )
    .unwrap();
    let archiver = fx.archiver(RetentionConfig::default());

    let report = archiver.run(&[document("empalme", &["EXPO"])], now()).await;

    assert!(!report.has_failures());
    assert_eq!(report.rows_deleted(), 1);
    assert_eq!(fx.sheet_text("EXPO"), "Fecha\n01/01/2020\n\n06/15/2024\n");
}
