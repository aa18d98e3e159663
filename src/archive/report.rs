//! Outcome of an archive run.

use chrono::NaiveDateTime;
use url::Url;

/// Results from a single archive run across all documents.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: NaiveDateTime,
    /// Rows dated strictly before this were eligible for pruning.
    pub cutoff: NaiveDateTime,
    pub dry_run: bool,
    pub documents: Vec<DocumentReport>,
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub document_id: String,
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Completed {
        /// Locator of the backup copy; `None` on dry runs.
        backup: Option<Url>,
        sheets: Vec<SheetReport>,
    },
    /// Processing stopped at the first error; earlier steps are not rolled back.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    pub outcome: SheetOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetOutcome {
    Processed {
        rows_found: usize,
        rows_deleted: usize,
        rows_trimmed: usize,
    },
    Missing,
}

impl DocumentReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Failed { .. })
    }

    pub fn sheets(&self) -> &[SheetReport] {
        match &self.outcome {
            DocumentOutcome::Completed { sheets, .. } => sheets,
            DocumentOutcome::Failed { .. } => &[],
        }
    }

    pub fn backup(&self) -> Option<&Url> {
        match &self.outcome {
            DocumentOutcome::Completed { backup, .. } => backup.as_ref(),
            DocumentOutcome::Failed { .. } => None,
        }
    }
}

impl RunReport {
    pub fn new(started_at: NaiveDateTime, cutoff: NaiveDateTime, dry_run: bool) -> Self {
        Self {
            started_at,
            cutoff,
            dry_run,
            documents: Vec::new(),
        }
    }

    pub fn document(&self, id: &str) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.document_id == id)
    }

    fn processed(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.documents
            .iter()
            .flat_map(|d| d.sheets())
            .filter_map(|s| match s.outcome {
                SheetOutcome::Processed {
                    rows_found,
                    rows_deleted,
                    rows_trimmed,
                } => Some((rows_found, rows_deleted, rows_trimmed)),
                SheetOutcome::Missing => None,
            })
    }

    /// Total rows marked by the scanner, including dry runs.
    pub fn rows_found(&self) -> usize {
        self.processed().map(|(found, _, _)| found).sum()
    }

    pub fn rows_deleted(&self) -> usize {
        self.processed().map(|(_, deleted, _)| deleted).sum()
    }

    pub fn rows_trimmed(&self) -> usize {
        self.processed().map(|(_, _, trimmed)| trimmed).sum()
    }

    pub fn sheets_processed(&self) -> usize {
        self.processed().count()
    }

    pub fn sheets_missing(&self) -> usize {
        self.documents
            .iter()
            .flat_map(|d| d.sheets())
            .filter(|s| s.outcome == SheetOutcome::Missing)
            .count()
    }

    pub fn failed_documents(&self) -> usize {
        self.documents.iter().filter(|d| d.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_documents() > 0
    }
}
