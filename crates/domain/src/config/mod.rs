mod calendar;
mod engine;
mod observability;
mod storage;

pub use calendar::*;
pub use engine::*;
pub use observability::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

const BUDGET_WARN_ABOVE: u32 = 1_000_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.calendar.first_weekday().is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "calendar.first_weekday".into(),
                message: format!(
                    "unknown weekday '{}' (expected e.g. \"sunday\" or \"monday\")",
                    self.calendar.first_weekday
                ),
            });
        }

        if let Err(message) = validate_timezone(&self.calendar.timezone) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "calendar.timezone".into(),
                message,
            });
        }

        if self.engine.catch_up_budget == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "engine.catch_up_budget".into(),
                message: "catch_up_budget must be greater than 0".into(),
            });
        } else if self.engine.catch_up_budget > BUDGET_WARN_ABOVE {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "engine.catch_up_budget".into(),
                message: format!(
                    "catch_up_budget {} is very large; misconfigured rules will take long to flag",
                    self.engine.catch_up_budget
                ),
            });
        }

        if self.storage.state_path.as_os_str().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "storage.state_path".into(),
                message: "state_path must not be empty".into(),
            });
        }

        errors
    }
}
