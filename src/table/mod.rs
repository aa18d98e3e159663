//! In-memory model of a sheet: an ordered list of ragged rows of cells.
//!
//! Row numbers exposed by this module are 1-based, matching how sheets are
//! addressed by the people maintaining them and by [`ScanResult`].

mod cell;

pub use cell::{Cell, DEFAULT_DATE_FORMATS, DateParser};

use crate::retention::ScanResult;

/// A single row of cells. Rows in the same table may differ in length.
pub type Row = Vec<Cell>;

/// Row and column counts of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SheetExtents {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a table from raw string fields, as read from disk.
    pub fn from_raw<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|f| Cell::from_raw(f.as_ref())).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn extents(&self) -> SheetExtents {
        SheetExtents {
            rows: self.len(),
            columns: self.column_count(),
        }
    }

    /// Cell at 1-based `row` and 0-based `column`.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        row.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .and_then(|r| r.get(column))
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Remove the row at 1-based `row`, returning it if it existed.
    pub fn delete_row(&mut self, row: usize) -> Option<Row> {
        let index = row.checked_sub(1)?;
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Delete every marked row in place, highest row number first.
    ///
    /// Row numbers in `scan` refer to the table as it was when scanned;
    /// deleting from the bottom up keeps every smaller pending number valid.
    /// Returns the number of rows removed.
    pub fn delete_rows_descending(&mut self, scan: &ScanResult) -> usize {
        scan.rows()
            .iter()
            .rev()
            .filter(|&&row| self.delete_row(row).is_some())
            .count()
    }

    /// Copy of this table with every marked row left out.
    pub fn without_rows(&self, scan: &ScanResult) -> Table {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !scan.contains(i + 1))
            .map(|(_, row)| row.clone())
            .collect();
        Table { rows }
    }

    /// Drop rows at the end of the table whose cells are all empty.
    ///
    /// Returns the number of rows removed. Empty rows followed by a
    /// non-empty row are kept.
    pub fn trim_trailing_empty_rows(&mut self) -> usize {
        let keep = self
            .rows
            .iter()
            .rposition(|row| !row_is_empty(row))
            .map_or(0, |last| last + 1);
        let removed = self.rows.len() - keep;
        self.rows.truncate(keep);
        removed
    }

    /// Text form of every row, suitable for writing back to disk.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }
}

impl From<Vec<Row>> for Table {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

fn row_is_empty(row: &Row) -> bool {
    row.iter().all(Cell::is_empty)
}
