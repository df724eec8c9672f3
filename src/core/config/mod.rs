//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Later sources override earlier ones:
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$CONFPATCH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/confpatch/config.toml`
//! 3. `~/.confpatch/config.toml` (canonical write location)
//!
//! # Repo Config Location
//!
//! `<common_dir>/confpatch/config.toml`

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::filter::{FileFilter, DEFAULT_INCLUDE_SUFFIXES};
use crate::core::paths::ConfpatchPaths;

/// Default prefix of the unpatch commit message.
pub const DEFAULT_MESSAGE_PREFIX: &str = "Update live config";

/// Keys understood by `confpatch config`.
pub const KEYS: &[&str] = &["message_prefix", "include_suffixes", "exclude_suffixes"];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("'{0}' is stored per repository; run inside one")]
    NoRepo(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub repo: RepoConfig,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration; repo config is read only when `paths` is given.
    ///
    /// Missing files are not an error.
    pub fn load(paths: Option<&ConfpatchPaths>) -> Result<Self, ConfigError> {
        let (global, global_path) = Self::load_global()?;
        global.validate()?;

        let (repo, repo_path) = match paths {
            Some(paths) => {
                let path = paths.repo_config_path();
                if path.exists() {
                    (read_toml::<RepoConfig>(&path)?, Some(path))
                } else {
                    (RepoConfig::default(), None)
                }
            }
            None => (RepoConfig::default(), None),
        };
        repo.validate()?;

        tracing::debug!(
            global = ?global_path,
            repo = ?repo_path,
            "configuration loaded"
        );

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("CONFPATCH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok((read_toml(&path)?, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("confpatch/config.toml");
            if path.exists() {
                return Ok((read_toml(&path)?, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".confpatch/config.toml");
            if path.exists() {
                return Ok((read_toml(&path)?, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Canonical global config path (`~/.confpatch/config.toml`).
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".confpatch/config.toml"))
    }

    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::global_config_path()?;
        write_config_atomic(&path, config)?;
        Ok(path)
    }

    pub fn write_repo(paths: &ConfpatchPaths, config: &RepoConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = paths.repo_config_path();
        write_config_atomic(&path, config)?;
        Ok(path)
    }

    // =========================================================================
    // Accessors with precedence
    // =========================================================================

    pub fn message_prefix(&self) -> &str {
        self.global
            .message_prefix
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGE_PREFIX)
    }

    pub fn include_suffixes(&self) -> Vec<String> {
        match &self.repo.include_suffixes {
            Some(list) => list.clone(),
            None => DEFAULT_INCLUDE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn exclude_suffixes(&self) -> Vec<String> {
        self.repo.exclude_suffixes.clone().unwrap_or_default()
    }

    /// Suffix policy for substitution.
    pub fn file_filter(&self) -> FileFilter {
        FileFilter::new(self.include_suffixes(), self.exclude_suffixes())
    }

    /// Effective value of a key, formatted for display.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        match key {
            "message_prefix" => Ok(self.message_prefix().to_string()),
            "include_suffixes" => Ok(self.include_suffixes().join(" ")),
            "exclude_suffixes" => Ok(self.exclude_suffixes().join(" ")),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    /// Set a key in the scope it belongs to and persist that scope.
    ///
    /// List values are whitespace or comma separated. Repo keys need `paths`.
    pub fn set(
        &mut self,
        paths: Option<&ConfpatchPaths>,
        key: &str,
        value: &str,
    ) -> Result<PathBuf, ConfigError> {
        let split = || -> Vec<String> {
            value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        let repo_paths = || paths.ok_or(ConfigError::NoRepo(key.to_string()));
        match key {
            "message_prefix" => {
                self.global.message_prefix = Some(value.to_string());
                Self::write_global(&self.global)
            }
            "include_suffixes" => {
                let paths = repo_paths()?;
                self.repo.include_suffixes = Some(split());
                Self::write_repo(paths, &self.repo)
            }
            "exclude_suffixes" => {
                let paths = repo_paths()?;
                self.repo.exclude_suffixes = Some(split());
                Self::write_repo(paths, &self.repo)
            }
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write to a sibling temp file, then rename over the target.
fn write_config_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ConfigError::WriteError { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err(path))?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;
    file.write_all(contents.as_bytes())
        .map_err(write_err(&temp_path))?;
    file.sync_all().map_err(write_err(&temp_path))?;

    fs::rename(&temp_path, path).map_err(write_err(path))?;
    Ok(())
}
