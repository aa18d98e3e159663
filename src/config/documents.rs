//! Documents to maintain and the sheets within them.
//!
//! ```toml
//! [[documents]]
//! id = "te-tracker-empalme"
//! description = "TE Tracker Empalme"
//! sheets = [
//!     { name = "EXPO", date_column = 0 },
//!     { name = "IMPO", date_column = 0 },
//! ]
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::storage::validate_name;

/// A document processed on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    /// Storage identifier of the document.
    pub id: String,

    /// Free-form note for humans reading the config; not used at runtime.
    #[serde(default)]
    pub description: Option<String>,

    /// Sheets to prune, in processing order.
    pub sheets: Vec<SheetConfig>,
}

/// A sheet to prune and the column holding each row's date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    /// Sheet name within the document.
    pub name: String,

    /// 0-based index of the date column.
    pub date_column: usize,
}

impl DocumentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("document id cannot be empty".to_string());
        }
        validate_name(&self.id).map_err(|e| format!("document id: {e}"))?;
        if self.sheets.is_empty() {
            return Err(format!("document '{}' has no sheets configured", self.id));
        }

        let mut seen = HashSet::new();
        for sheet in &self.sheets {
            if sheet.name.trim().is_empty() {
                return Err(format!("document '{}' has a sheet with no name", self.id));
            }
            validate_name(&sheet.name)
                .map_err(|e| format!("document '{}' sheet name: {e}", self.id))?;
            if !seen.insert(sheet.name.as_str()) {
                return Err(format!(
                    "document '{}' lists sheet '{}' more than once",
                    self.id, sheet.name
                ));
            }
        }
        Ok(())
    }
}

/// Validate the full document list.
pub fn validate_documents(documents: &[DocumentConfig]) -> Result<(), String> {
    if documents.is_empty() {
        return Err("at least one [[documents]] entry is required".to_string());
    }

    let mut ids = HashSet::new();
    for document in documents {
        document.validate()?;
        if !ids.insert(document.id.as_str()) {
            return Err(format!("duplicate document id '{}'", document.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn document(id: &str, sheets: &[(&str, usize)]) -> DocumentConfig {
        DocumentConfig {
            id: id.to_string(),
            description: None,
            sheets: sheets
                .iter()
                .map(|(name, date_column)| SheetConfig {
                    name: name.to_string(),
                    date_column: *date_column,
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_inline_sheets() {
        #[derive(Deserialize)]
        struct Wrapper {
            documents: Vec<DocumentConfig>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[documents]]
            id = "hermosillo"
            description = "TE Tracker Hermosillo"
            sheets = [
                { name = "EXPO", date_column = 1 },
                { name = "IMPO", date_column = 0 },
            ]
        "#,
        )
        .unwrap();

        let doc = &parsed.documents[0];
        assert_eq!(doc.id, "hermosillo");
        assert_eq!(doc.description.as_deref(), Some("TE Tracker Hermosillo"));
        assert_eq!(
            doc.sheets[0],
            SheetConfig {
                name: "EXPO".into(),
                date_column: 1
            }
        );
    }

    #[test]
    fn test_validate_documents() {
        assert!(validate_documents(&[]).is_err());
        assert!(validate_documents(&[document("a", &[("EXPO", 0)])]).is_ok());

        let err = validate_documents(&[
            document("a", &[("EXPO", 0)]),
            document("a", &[("IMPO", 0)]),
        ])
        .unwrap_err();
        assert!(err.contains("duplicate"), "{err}");
    }

    #[test]
    fn test_validate_document_sheets() {
        assert!(document("a", &[]).validate().is_err());
        assert!(document(" ", &[("EXPO", 0)]).validate().is_err());
        assert!(document("a", &[("", 0)]).validate().is_err());

        let err = document("a", &[("EXPO", 0), ("EXPO", 1)])
            .validate()
            .unwrap_err();
        assert!(err.contains("more than once"), "{err}");
    }

    #[rstest]
    #[case::parent_dir("..")]
    #[case::nested("trackers/empalme")]
    #[case::backslash("trackers\\empalme")]
    #[case::escape("../empalme")]
    fn test_validate_rejects_path_like_names(#[case] name: &str) {
        let err = document(name, &[("EXPO", 0)]).validate().unwrap_err();
        assert!(err.contains("document id"), "{err}");

        let err = document("empalme", &[(name, 0)]).validate().unwrap_err();
        assert!(err.contains("sheet name"), "{err}");
    }

    #[test]
    fn test_path_like_names_fail_config_load() {
        let err = crate::config::ArchiverConfig::from_str(
            r#"
            [[documents]]
            id = "empalme"
            sheets = [{ name = "../EXPO", date_column = 0 }]
        "#,
        )
        .unwrap_err();
        assert!(
            matches!(err, crate::config::ConfigError::Validation(_)),
            "{err}"
        );
    }
}
