//! Retention scan over a single sheet.
//!
//! A sheet starts with a preamble of header or undated rows. The first row
//! whose date column holds a valid date opens the dated section and is
//! always kept. Every later row is marked when its date is strictly older
//! than the cutoff. Rows are evaluated independently; sort order is assumed
//! by the people maintaining the sheets but never relied on.

use chrono::NaiveDateTime;

use crate::table::{DateParser, Table};

/// Where to look for the date and how old a row may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// 0-based index of the date column.
    pub date_column: usize,
    /// Earliest date to retain.
    pub cutoff: NaiveDateTime,
}

/// Rows marked for deletion, as ascending 1-based row numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    rows: Vec<usize>,
    section_start: Option<usize>,
}

impl ScanResult {
    /// Build a result from arbitrary row numbers; they are sorted and deduplicated.
    pub fn from_rows(mut rows: Vec<usize>) -> Self {
        rows.sort_unstable();
        rows.dedup();
        Self {
            rows,
            section_start: None,
        }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.binary_search(&row).is_ok()
    }

    /// Row number of the first dated row, if the sheet has one.
    pub fn section_start(&self) -> Option<usize> {
        self.section_start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Still inside the header/undated preamble.
    Seeking,
    /// Past the first dated row.
    Active { section_start: usize },
}

/// Decides which rows of a table fall outside the retention window.
#[derive(Debug, Clone, Default)]
pub struct RetentionScanner {
    parser: DateParser,
}

impl RetentionScanner {
    pub fn new(parser: DateParser) -> Self {
        Self { parser }
    }

    pub fn scan(&self, table: &Table, policy: &ScanPolicy) -> ScanResult {
        let (state, rows) = table.rows().iter().enumerate().fold(
            (ScanState::Seeking, Vec::new()),
            |(state, mut marked), (i, row)| {
                let row_number = i + 1;
                let date = row
                    .get(policy.date_column)
                    .and_then(|cell| cell.as_date(&self.parser));

                let next = match (state, date) {
                    (ScanState::Seeking, Some(_)) => ScanState::Active {
                        section_start: row_number,
                    },
                    (ScanState::Seeking, None) => ScanState::Seeking,
                    (active @ ScanState::Active { .. }, Some(date)) => {
                        if date < policy.cutoff {
                            marked.push(row_number);
                        }
                        active
                    }
                    (active @ ScanState::Active { .. }, None) => active,
                };

                (next, marked)
            },
        );

        ScanResult {
            rows,
            section_start: match state {
                ScanState::Active { section_start } => Some(section_start),
                ScanState::Seeking => None,
            },
        }
    }
}
