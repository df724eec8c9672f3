//! core::filter
//!
//! Suffix policy deciding which tracked files take part in substitution.
//!
//! Matching is case-sensitive. A file is included when its last extension
//! (with the leading dot) is in the allow list and its file name does not
//! end with any deny-list suffix. The deny list wins.

use std::collections::BTreeSet;
use std::path::Path;

/// Suffixes substituted when no configuration overrides them.
pub const DEFAULT_INCLUDE_SUFFIXES: &[&str] =
    &[".conf", ".properties", ".toml", ".txt", ".yaml", ".yml"];

/// Allow/deny policy over file suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    /// `None` means every file is allowed.
    include: Option<BTreeSet<String>>,
    exclude: Vec<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUDE_SUFFIXES.iter().copied(), std::iter::empty::<&str>())
    }
}

impl FileFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include: Some(include.into_iter().map(Into::into).collect()),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter that accepts every path; used when staging all tracked files.
    pub fn all() -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.exclude.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            return false;
        }
        match &self.include {
            None => true,
            Some(allowed) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| allowed.contains(&format!(".{ext}"))),
        }
    }
}
