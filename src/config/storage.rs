//! Document and backup storage configuration.
//!
//! Documents live on the local filesystem: document `{id}` is the directory
//! `{root}/{id}` and each sheet is a CSV file inside it. Backups are full
//! copies of the document directory placed under `archive_dir`.
//!
//! # Example Configuration
//!
//! ```toml
//! [storage]
//! root = "/srv/trackers"
//! archive_dir = "/srv/trackers-archive"
//! create_dirs = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Storage locations for documents and their backups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory containing one subdirectory per document.
    /// Default: "."
    #[serde(default = "default_root")]
    pub root: String,

    /// Directory that receives backup copies.
    /// Default: "archive"
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,

    /// Create the archive directory if it doesn't exist.
    /// Default: true
    #[serde(default = "default_true")]
    pub create_dirs: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            archive_dir: default_archive_dir(),
            create_dirs: true,
        }
    }
}

fn default_root() -> String {
    ".".to_string()
}

fn default_archive_dir() -> String {
    "archive".to_string()
}

fn default_true() -> bool {
    true
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.root.trim().is_empty() {
            return Err("storage.root cannot be empty".to_string());
        }
        if self.archive_dir.trim().is_empty() {
            return Err("storage.archive_dir cannot be empty".to_string());
        }
        if Path::new(&self.archive_dir) == Path::new(&self.root) {
            return Err(
                "storage.archive_dir must differ from storage.root, \
                 otherwise backups would be picked up as documents"
                    .to_string(),
            );
        }
        Ok(())
    }
}
