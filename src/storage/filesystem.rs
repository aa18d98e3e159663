//! Filesystem document backend.
//!
//! Document `{id}` is the directory `{root}/{id}`; its display name is the
//! directory name. Sheet `{name}` is the file `{name}.csv` inside it, with
//! no header handling: every line is a row. A blank line reads as a row
//! holding one empty cell, and such rows are written back as blank lines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Document, DocumentStore, StorageError, StorageResult, validate_name};
use crate::{
    config::StorageConfig,
    table::{Cell, Row, SheetExtents, Table},
};

const SHEET_EXTENSION: &str = "csv";

/// Opens documents stored as directories under a common root.
pub struct FilesystemDocumentStore {
    root: PathBuf,
}

impl FilesystemDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentStore for FilesystemDocumentStore {
    #[instrument(skip(self))]
    async fn open(&self, document_id: &str) -> StorageResult<Box<dyn Document>> {
        validate_name(document_id)?;
        let path = self.root.join(document_id);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StorageError::DocumentNotFound(document_id.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::DocumentNotFound(document_id.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| document_id.to_string());

        debug!(path = %path.display(), "Opened document");
        Ok(Box::new(FilesystemDocument {
            id: document_id.to_string(),
            name,
            path,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// A document backed by a directory of CSV sheets.
pub struct FilesystemDocument {
    id: String,
    name: String,
    path: PathBuf,
}

impl FilesystemDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sheet_path(&self, sheet: &str) -> StorageResult<PathBuf> {
        validate_name(sheet)?;
        Ok(self.path.join(format!("{sheet}.{SHEET_EXTENSION}")))
    }

    async fn existing_sheet_path(&self, sheet: &str) -> StorageResult<PathBuf> {
        let path = self.sheet_path(sheet)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StorageError::SheetNotFound(sheet.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl Document for FilesystemDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn sheet_names(&self) -> StorageResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == SHEET_EXTENSION)
                && entry.file_type().await?.is_file()
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn has_sheet(&self, sheet: &str) -> StorageResult<bool> {
        let path = self.sheet_path(sheet)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    #[instrument(skip(self))]
    async fn create_sheet(&self, sheet: &str) -> StorageResult<()> {
        let path = self.sheet_path(sheet)?;
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => {
                debug!(path = %path.display(), "Created sheet");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::SheetExists(sheet.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn read_sheet(&self, sheet: &str) -> StorageResult<Table> {
        let path = self.existing_sheet_path(sheet).await?;
        read_csv_table(&path).await
    }

    #[instrument(skip(self, table), fields(rows = table.len()))]
    async fn write_sheet(&self, sheet: &str, table: &Table) -> StorageResult<()> {
        let path = self.existing_sheet_path(sheet).await?;
        let content = encode_csv(table)?;
        write_atomic(&path, &content).await?;
        debug!(path = %path.display(), "Wrote sheet");
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: Row) -> StorageResult<()> {
        let mut table = self.read_sheet(sheet).await?;
        table.push_row(row);
        self.write_sheet(sheet, &table).await
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> StorageResult<()> {
        let mut table = self.read_sheet(sheet).await?;
        if table.delete_row(row).is_some() {
            self.write_sheet(sheet, &table).await?;
        }
        Ok(())
    }

    async fn extents(&self, sheet: &str) -> StorageResult<SheetExtents> {
        Ok(self.read_sheet(sheet).await?.extents())
    }
}

/// Read a headerless CSV file into a table.
pub async fn read_csv_table(path: &Path) -> StorageResult<Table> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::SheetNotFound(path.display().to_string()));
        }
        Err(e) => return Err(StorageError::Io(e)),
    };
    decode_csv(&content)
}

fn decode_csv(content: &[u8]) -> StorageResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut rows: Vec<Row> = Vec::new();
    let mut record = csv::StringRecord::new();
    let mut offset = 0usize;
    loop {
        // The csv reader skips blank lines; they are still rows of the sheet
        let blank = blank_lines_at(content, offset);
        rows.extend(std::iter::repeat_n(vec![Cell::Empty], blank));

        if !reader.read_record(&mut record)? {
            break;
        }
        rows.push(record.iter().map(Cell::from_raw).collect());
        offset = usize::try_from(reader.position().byte()).unwrap_or(content.len());
    }
    Ok(Table::new(rows))
}

/// Count the blank lines starting at byte `offset`.
fn blank_lines_at(content: &[u8], mut offset: usize) -> usize {
    // A record ended by `\r\n` may stop after the `\r`
    if offset > 0 && content.get(offset - 1) == Some(&b'\r') && content.get(offset) == Some(&b'\n')
    {
        offset += 1;
    }

    let mut count = 0;
    loop {
        match content.get(offset..) {
            Some([b'\r', b'\n', ..]) => offset += 2,
            Some([b'\n' | b'\r', ..]) => offset += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

fn encode_csv(table: &Table) -> StorageResult<Vec<u8>> {
    let records = table.to_records();
    let mut out = Vec::new();

    for chunk in records.chunk_by(|a, b| is_blank_record(a) == is_blank_record(b)) {
        if is_blank_record(&chunk[0]) {
            out.extend(std::iter::repeat_n(b'\n', chunk.len()));
            continue;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for record in chunk {
            writer.write_record(record)?;
        }
        out.extend(
            writer
                .into_inner()
                .map_err(|e| StorageError::Io(e.into_error()))?,
        );
    }

    Ok(out)
}

/// Rows with no cells or one empty cell are written as a bare line break.
fn is_blank_record(record: &[String]) -> bool {
    record.len() <= 1 && record.iter().all(String::is_empty)
}

/// Write to a temp file first, then rename for atomicity.
async fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let temp_path = path.with_extension(format!("{SHEET_EXTENSION}.tmp"));
    tokio::fs::write(&temp_path, content).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
