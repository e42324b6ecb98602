#![warn(missing_docs)]

//! # guard-config
//!
//! Configuration loading for the expression guard.
//!
//! Every setting is optional; an absent key keeps the validator's built-in
//! default. String values may reference environment variables as `${NAME}`.
//!
//! ## Example
//!
//! ```toml
//! [validator]
//! max_script_bytes = 65536
//! max_nesting_depth = 256
//!
//! [batch]
//! max_concurrent = 8
//! audit = true
//! audit_log = "${HOME}/exprguard-audit.jsonl"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors from config parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level guard configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardConfig {
    /// Per-script validation limits.
    #[serde(default)]
    pub validator: ValidatorOverrides,

    /// Batch runner settings.
    #[serde(default)]
    pub batch: BatchOverrides,
}

/// Validator limit overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorOverrides {
    /// Largest script accepted for parsing, in bytes.
    #[serde(default)]
    pub max_script_bytes: Option<usize>,

    /// Deepest nesting accepted, before parsing and in the syntax tree.
    #[serde(default)]
    pub max_nesting_depth: Option<usize>,
}

/// Batch runner overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchOverrides {
    /// Scripts validated at once.
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Emit one audit event per script.
    #[serde(default)]
    pub audit: Option<bool>,

    /// Append audit entries as JSON lines to this file instead of the log.
    #[serde(default)]
    pub audit_log: Option<String>,
}

impl GuardConfig {
    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: GuardConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string, expanding `${ENV_VAR}` references.
    pub fn from_toml_with_env(toml_str: &str) -> Result<Self, ConfigError> {
        Self::from_toml(&expand_env_vars(toml_str))
    }

    /// Load config from a file path, expanding environment variables.
    pub fn from_file_with_env(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_with_env(&content)
    }

    /// Whether per-script auditing is on. Defaults to off.
    pub fn audit_enabled(&self) -> bool {
        self.batch.audit.unwrap_or(false) || self.batch.audit_log.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("validator.max_script_bytes", self.validator.max_script_bytes),
            ("validator.max_nesting_depth", self.validator.max_nesting_depth),
            ("batch.max_concurrent", self.batch.max_concurrent),
        ];
        for (key, value) in limits {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
            }
        }
        if matches!(self.batch.audit_log.as_deref(), Some(path) if path.trim().is_empty()) {
            return Err(ConfigError::Invalid("batch.audit_log must not be empty".into()));
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns using the process environment.
///
/// Unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        result.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            result.push_str(&rest[open..]);
            return result;
        };
        let name = &after[..close];
        match std::env::var(name) {
            Ok(value) => result.push_str(&value),
            Err(_) => result.push_str(&rest[open..open + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }

    result.push_str(rest);
    result
}
