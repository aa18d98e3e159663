//! Row retention configuration.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! months = 3
//! dry_run = false
//! trim_trailing_empty_rows = true
//! date_formats = ["%m/%d/%Y", "%Y-%m-%d"]
//! ```

use serde::{Deserialize, Serialize};

use crate::table::{DEFAULT_DATE_FORMATS, DateParser};

/// Retention policy applied to every configured sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Rows dated more than this many calendar months before the run are pruned.
    /// Default: 3
    #[serde(default = "default_months")]
    pub months: u32,

    /// If true, scan and log what would be pruned without backing up,
    /// writing the archive log, or modifying any sheet.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Remove fully empty rows left at the end of a sheet after pruning.
    /// Default: true
    #[serde(default = "default_true")]
    pub trim_trailing_empty_rows: bool,

    /// `strftime` formats tried, in order, when reading a date cell.
    /// RFC 3339 timestamps are always accepted.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            months: default_months(),
            dry_run: false,
            trim_trailing_empty_rows: true,
            date_formats: default_date_formats(),
        }
    }
}

fn default_months() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.months == 0 {
            return Err("retention.months must be at least 1".to_string());
        }
        if self.date_formats.is_empty() {
            return Err("retention.date_formats must not be empty".to_string());
        }
        if let Some(blank) = self.date_formats.iter().find(|f| f.trim().is_empty()) {
            return Err(format!(
                "retention.date_formats contains a blank format: {blank:?}"
            ));
        }
        Ok(())
    }

    pub fn date_parser(&self) -> DateParser {
        DateParser::new(self.date_formats.iter().cloned())
    }
}
