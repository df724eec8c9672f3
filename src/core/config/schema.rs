//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! ```toml
//! message_prefix = "Update live config"
//! ```
//!
//! # Repo Config
//!
//! ```toml
//! include_suffixes = [".properties", ".yml"]
//! exclude_suffixes = [".secret.yml"]
//! ```
//!
//! Unknown keys are rejected, and values are validated after parsing.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Prefix of the default unpatch commit message.
    pub message_prefix: Option<String>,
}

impl GlobalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(prefix) = &self.message_prefix {
            if prefix.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "message_prefix cannot be empty".to_string(),
                ));
            }
            if prefix.contains('\n') {
                return Err(ConfigError::InvalidValue(
                    "message_prefix must be a single line".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Repository configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Allow list of file suffixes that take part in substitution.
    pub include_suffixes: Option<Vec<String>>,

    /// Deny list matched against the end of the file name.
    pub exclude_suffixes: Option<Vec<String>>,
}

impl RepoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, list) in [
            ("include_suffixes", &self.include_suffixes),
            ("exclude_suffixes", &self.exclude_suffixes),
        ] {
            for suffix in list.iter().flatten() {
                validate_suffix(key, suffix)?;
            }
        }
        Ok(())
    }
}

fn validate_suffix(key: &str, suffix: &str) -> Result<(), ConfigError> {
    if suffix.len() < 2 || !suffix.starts_with('.') {
        return Err(ConfigError::InvalidValue(format!(
            "{key}: suffix '{suffix}' must start with '.' and name an extension"
        )));
    }
    if suffix.contains('/') || suffix.contains('\\') {
        return Err(ConfigError::InvalidValue(format!(
            "{key}: suffix '{suffix}' cannot contain path separators"
        )));
    }
    Ok(())
}
