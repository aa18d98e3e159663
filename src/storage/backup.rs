//! Filesystem backups.
//!
//! A backup is a copy of every file in the document directory, placed in
//! `{archive_dir}/{backup_name}`. Existing backups are never overwritten.
//! Files are copied into a hidden `.{backup_name}.partial` directory first
//! and renamed into place, so a failed copy leaves no backup behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{BackupTarget, StorageError, StorageResult, validate_name};
use crate::config::StorageConfig;

/// Copies filesystem documents into an archive directory.
pub struct FilesystemBackup {
    documents_root: PathBuf,
    archive_dir: PathBuf,
}

impl FilesystemBackup {
    pub fn new(
        documents_root: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
        create_dir: bool,
    ) -> StorageResult<Self> {
        let backup = Self {
            documents_root: documents_root.into(),
            archive_dir: archive_dir.into(),
        };

        if create_dir && !backup.archive_dir.exists() {
            info!(path = %backup.archive_dir.display(), "Creating archive directory");
            std::fs::create_dir_all(&backup.archive_dir)?;
        }

        Ok(backup)
    }

    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        Self::new(&config.root, &config.archive_dir, config.create_dirs)
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }
}

#[async_trait]
impl BackupTarget for FilesystemBackup {
    #[instrument(skip(self))]
    async fn backup(&self, document_id: &str, backup_name: &str) -> StorageResult<Url> {
        validate_name(document_id)?;
        validate_name(backup_name)?;

        let source = self.documents_root.join(document_id);
        if !tokio::fs::metadata(&source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(StorageError::DocumentNotFound(document_id.to_string()));
        }

        let destination = self.archive_dir.join(backup_name);
        if tokio::fs::try_exists(&destination).await? {
            return Err(StorageError::BackupExists(
                destination.display().to_string(),
            ));
        }

        // Copy next to the destination and move it into place only once complete
        let staging = self.archive_dir.join(format!(".{backup_name}.partial"));
        let copied = fill_staging(&staging, copy_files(&source, &staging)).await?;

        if let Err(e) = tokio::fs::rename(&staging, &destination).await {
            remove_staging(&staging).await;
            return Err(StorageError::Io(e));
        }

        let absolute = tokio::fs::canonicalize(&destination).await?;
        let url = Url::from_directory_path(&absolute)
            .map_err(|_| StorageError::Locator(absolute.display().to_string()))?;

        debug!(files = copied, url = %url, "Backup copied");
        Ok(url)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Run `fill` against a fresh staging directory, removing the directory if it fails.
///
/// A staging directory left behind by an interrupted run is discarded first.
async fn fill_staging<Fut>(staging: &Path, fill: Fut) -> StorageResult<usize>
where
    Fut: Future<Output = StorageResult<usize>>,
{
    match tokio::fs::create_dir(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            warn!(path = %staging.display(), "Removing leftover partial backup");
            tokio::fs::remove_dir_all(staging).await?;
            tokio::fs::create_dir(staging).await?;
        }
        Err(e) => return Err(StorageError::Io(e)),
    }

    match fill.await {
        Ok(copied) => Ok(copied),
        Err(e) => {
            remove_staging(staging).await;
            Err(e)
        }
    }
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(staging).await {
        warn!(path = %staging.display(), error = %e, "Failed to remove partial backup");
    }
}

/// Copy every regular file in `source` into `destination`, returning how many were copied.
async fn copy_files(source: &Path, destination: &Path) -> StorageResult<usize> {
    let mut entries = tokio::fs::read_dir(source).await?;
    let mut copied = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            debug!(path = %entry.path().display(), "Skipping non-file entry");
            continue;
        }
        tokio::fs::copy(entry.path(), destination.join(entry.file_name())).await?;
        copied += 1;
    }
    Ok(copied)
}
