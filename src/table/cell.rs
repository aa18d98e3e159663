use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date formats tried, in order, when a text cell is interpreted as a date.
///
/// Date-only formats resolve to midnight. US-style `month/day/year` is
/// accepted because that is how the tracking sheets are filled in by hand.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

/// A single scalar value in a sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    /// Build a cell from a raw field as stored on disk.
    ///
    /// Only the zero-length field is `Empty`; everything else is kept verbatim
    /// as text so that writing the sheet back never reformats user data.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Interpret this cell as a calendar date.
    ///
    /// Numbers are never dates, even though some spreadsheet engines store
    /// dates as serial numbers.
    pub fn as_date(&self, parser: &DateParser) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(date) => Some(*date),
            Cell::Text(text) => parser.parse(text),
            Cell::Empty | Cell::Number(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(date) if date.time() == chrono::NaiveTime::MIN => {
                write!(f, "{}", date.format("%Y-%m-%d"))
            }
            Cell::Date(date) => write!(f, "{}", date.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_raw(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Date(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

/// Parses text cells into dates using an ordered list of `strftime` formats.
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<String>,
}

impl DateParser {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parse `raw` as a date, returning `None` when no format matches.
    ///
    /// RFC 3339 timestamps are always accepted and converted to the wall
    /// clock time of their own offset.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }

        for format in &self.formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(dt);
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Some(date.and_time(chrono::NaiveTime::MIN));
            }
        }

        None
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().copied())
    }
}
