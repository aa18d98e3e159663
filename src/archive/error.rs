use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open document: {0}")]
    Open(#[source] StorageError),

    #[error("Backup failed: {0}")]
    Backup(#[source] StorageError),

    #[error("Failed to write archive log: {0}")]
    Log(#[source] StorageError),

    #[error("Failed to process sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: StorageError,
    },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
