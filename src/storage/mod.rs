//! Pluggable document and backup storage.
//!
//! The archiver only talks to documents through these traits:
//!
//! - [`DocumentStore`] opens a document by its identifier
//! - [`Document`] reads, writes and creates the named sheets inside it
//! - [`BackupTarget`] copies a whole document somewhere safe and returns a
//!   URL pointing at the copy
//!
//! The shipped backend keeps each document as a directory of CSV files,
//! configured via `[storage]`.

mod backup;
mod filesystem;

use async_trait::async_trait;
pub use backup::FilesystemBackup;
pub use filesystem::{FilesystemDocument, FilesystemDocumentStore, read_csv_table};
use thiserror::Error;
use url::Url;

use crate::table::{Row, SheetExtents, Table};

/// Errors that can occur during document storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Sheet already exists: {0}")]
    SheetExists(String),

    #[error("Invalid name '{0}': must be non-empty and contain no path separators")]
    InvalidName(String),

    #[error("Backup already exists: {0}")]
    BackupExists(String),

    #[error("Cannot build locator for {0}")]
    Locator(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Opens documents by identifier.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn open(&self, document_id: &str) -> StorageResult<Box<dyn Document>>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// A document holding named sheets.
///
/// Row numbers are 1-based.
#[async_trait]
pub trait Document: Send + Sync {
    /// Identifier the document was opened with.
    fn id(&self) -> &str;

    /// Human-readable name, used in backup names.
    fn name(&self) -> &str;

    async fn sheet_names(&self) -> StorageResult<Vec<String>>;

    async fn has_sheet(&self, sheet: &str) -> StorageResult<bool>;

    /// Create an empty sheet. Fails if one with the same name exists.
    async fn create_sheet(&self, sheet: &str) -> StorageResult<()>;

    async fn read_sheet(&self, sheet: &str) -> StorageResult<Table>;

    /// Replace the whole content of an existing sheet.
    async fn write_sheet(&self, sheet: &str, table: &Table) -> StorageResult<()>;

    async fn append_row(&self, sheet: &str, row: Row) -> StorageResult<()>;

    /// Delete a single row. Deleting past the end is a no-op.
    async fn delete_row(&self, sheet: &str, row: usize) -> StorageResult<()>;

    async fn extents(&self, sheet: &str) -> StorageResult<SheetExtents>;
}

/// Produces backup copies of documents.
#[async_trait]
pub trait BackupTarget: Send + Sync {
    /// Copy the document to a new backup named `backup_name` and return its locator.
    async fn backup(&self, document_id: &str, backup_name: &str) -> StorageResult<Url>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Reject names that could escape their parent directory.
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
