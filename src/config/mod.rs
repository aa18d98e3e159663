//! Configuration module for the tracker archiver.
//!
//! The archiver is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! root = "/srv/trackers"
//! archive_dir = "${ARCHIVE_DIR}"
//!
//! [[documents]]
//! id = "te-tracker-empalme"
//! sheets = [{ name = "EXPO", date_column = 0 }]
//! ```

mod documents;
mod observability;
mod retention;
mod schedule;
mod storage;

use std::{path::Path, sync::LazyLock};

pub use documents::*;
pub use observability::*;
use regex::Regex;
pub use retention::*;
pub use schedule::*;
use serde::{Deserialize, Serialize};
pub use storage::*;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Root configuration for the archiver.
///
/// Every section except `documents` is optional with sensible defaults.
/// The structure is loaded once and handed to the run; nothing reads it
/// from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ArchiverConfig {
    /// Where documents and backups live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retention window and pruning behaviour.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// When `watch` mode runs.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Documents processed on every run, in order.
    #[serde(default)]
    pub documents: Vec<DocumentConfig>,
}

impl ArchiverConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: ArchiverConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate().map_err(ConfigError::Validation)?;
        self.retention.validate().map_err(ConfigError::Validation)?;
        self.schedule.validate().map_err(ConfigError::Validation)?;
        validate_documents(&self.documents).map_err(ConfigError::Validation)?;
        Ok(())
    }

    /// Look up a configured document by id.
    pub fn document(&self, id: &str) -> Option<&DocumentConfig> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Generate the JSON schema for the configuration file.
    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ArchiverConfig)
    }

    /// Generate the JSON schema as a pretty-printed JSON string.
    #[cfg(feature = "json-schema")]
    pub fn json_schema_string() -> String {
        serde_json::to_string_pretty(&Self::json_schema())
            .expect("schema serialization should not fail")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_REGEX.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
