mod assistant;
mod leads;
mod observability;
mod runtime;
mod sessions;

pub use assistant::*;
pub use leads::*;
pub use observability::*;
pub use runtime::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub leads: LeadsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

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
        let mut error = |field: &str, message: &str| {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: field.into(),
                message: message.into(),
            })
        };

        if self.assistant.base_url.is_empty() {
            error("assistant.base_url", "base_url must not be empty");
        }
        if self.assistant.assistant_id.is_empty() {
            error("assistant.assistant_id", "assistant_id must be set");
        }
        if self.runtime.message_timeout_secs == 0 {
            error("runtime.message_timeout_secs", "must be greater than 0");
        }
        if self.sessions.cleanup_interval_secs == 0 {
            error("sessions.cleanup_interval_secs", "must be greater than 0");
        }
        if let Some(trello) = &self.leads.trello {
            if trello.list_id.is_empty() {
                error("leads.trello.list_id", "list_id must not be empty");
            }
            if trello.timezone.parse::<chrono_tz::Tz>().is_err() {
                error("leads.trello.timezone", "unknown IANA time zone");
            }
        }

        // Warnings.
        if self.assistant.api_key().is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "assistant.api_key_env".into(),
                message: format!("environment variable {} is not set", self.assistant.api_key_env),
            });
        }
        if self.runtime.poll_interval_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "runtime.poll_interval_ms".into(),
                message: "a zero poll interval busy-loops against the assistant API".into(),
            });
        }
        if self.sessions.idle_timeout_secs < self.runtime.message_timeout_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "sessions.idle_timeout_secs".into(),
                message: "shorter than the message timeout; sessions may be evicted mid-run".into(),
            });
        }

        errors
    }

    /// `true` when `validate()` reports no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|e| e.severity != ConfigSeverity::Error)
    }
}
