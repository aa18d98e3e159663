//! Monthly trigger used by `watch` mode.
//!
//! ```toml
//! [schedule]
//! day_of_month = 1
//! hour = 1
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Day of the month to run on (1-28, so every month has it).
    /// Default: 1
    #[serde(default = "default_day_of_month")]
    pub day_of_month: u32,

    /// Local hour of day to run at (0-23).
    /// Default: 1
    #[serde(default = "default_hour")]
    pub hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_of_month: default_day_of_month(),
            hour: default_hour(),
        }
    }
}

fn default_day_of_month() -> u32 {
    1
}

fn default_hour() -> u32 {
    1
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=28).contains(&self.day_of_month) {
            return Err(format!(
                "schedule.day_of_month must be between 1 and 28, got {}",
                self.day_of_month
            ));
        }
        if self.hour > 23 {
            return Err(format!(
                "schedule.hour must be between 0 and 23, got {}",
                self.hour
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScheduleConfig::default();
        assert_eq!(config.day_of_month, 1);
        assert_eq!(config.hour, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = ScheduleConfig {
            day_of_month: 28,
            hour: 23,
        };
        assert!(config.validate().is_ok());

        config.day_of_month = 29;
        assert!(config.validate().unwrap_err().contains("day_of_month"));

        config.day_of_month = 0;
        assert!(config.validate().is_err());

        config.day_of_month = 15;
        config.hour = 24;
        assert!(config.validate().unwrap_err().contains("hour"));
    }
}
