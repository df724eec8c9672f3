//! git::backend
//!
//! The version-control capability the protocols consume.
//!
//! The protocols only ever talk to a [`Backend`]. Production code uses the
//! `git2` adapter ([`super::Git`]); tests drive the same protocol code
//! against [`super::mock::MockRepo`].
//!
//! All methods take `&self`. Callers must serialize access: a backend owns
//! one working tree, its index and the branch HEAD follows for the duration
//! of a protocol call.

use std::path::{Path, PathBuf};

use super::GitError;
use crate::core::filter::FileFilter;
use crate::core::types::Oid;

/// How far a reset reaches, as `(index, working_tree)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Move the ref only; index and working tree keep their content.
    Soft,
    /// Move the ref and reset the index; the working tree is untouched.
    Mixed,
    /// Move the ref and reset both index and working tree.
    Hard,
}

impl ResetMode {
    /// Build a mode from the two reset flags.
    pub fn from_flags(index: bool, working_tree: bool) -> Self {
        match (index, working_tree) {
            (_, true) => ResetMode::Hard,
            (true, false) => ResetMode::Mixed,
            (false, false) => ResetMode::Soft,
        }
    }

    pub fn resets_index(self) -> bool {
        !matches!(self, ResetMode::Soft)
    }

    pub fn resets_working_tree(self) -> bool {
        matches!(self, ResetMode::Hard)
    }
}

/// Commit-graph primitives over one working tree.
pub trait Backend {
    /// Root of the working tree.
    fn work_dir(&self) -> &Path;

    /// Commit HEAD points at.
    fn head(&self) -> Result<Oid, GitError>;

    /// First parent of `commit`. Fails with [`GitError::RootCommit`] for a root.
    fn parent(&self, commit: &Oid) -> Result<Oid, GitError>;

    /// Staged or unstaged changes to tracked files. Untracked files don't count.
    fn is_dirty(&self) -> Result<bool, GitError>;

    fn is_head_detached(&self) -> Result<bool, GitError>;

    /// Files in the HEAD tree that exist on disk and pass `filter`.
    ///
    /// Paths are absolute. Submodules and symlinks are skipped.
    fn tracked_files(&self, filter: &FileFilter) -> Result<Vec<PathBuf>, GitError>;

    /// Every file in the HEAD tree, including ones deleted from disk.
    ///
    /// Paths are absolute. Submodules and symlinks are skipped.
    fn head_files(&self) -> Result<Vec<PathBuf>, GitError>;

    /// Stage `paths`; a path missing on disk is removed from the index.
    fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError>;

    /// Commit the index on top of HEAD, advancing whatever HEAD follows.
    fn commit(&self, subject: &str) -> Result<Oid, GitError>;

    /// First line of the commit message.
    fn commit_subject(&self, commit: &Oid) -> Result<String, GitError>;

    /// Commit hash a revision expression resolves to.
    fn resolve(&self, rev: &str) -> Result<Oid, GitError>;

    /// Point HEAD's target at `target`, resetting as far as `mode` says.
    fn reset(&self, target: &Oid, mode: ResetMode) -> Result<(), GitError>;

    /// Commit the inverse of `commit` on top of HEAD and sync index and
    /// working tree to it.
    ///
    /// Never prompts. A conflicting revert fails with
    /// [`GitError::RevertConflict`] before the index or working tree change.
    fn revert(&self, commit: &Oid) -> Result<Oid, GitError>;

    /// Repoint the branch HEAD follows. Fails on a detached HEAD.
    fn move_branch_ref(&self, target: &Oid) -> Result<(), GitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_modes() {
        assert_eq!(ResetMode::from_flags(false, false), ResetMode::Soft);
        assert_eq!(ResetMode::from_flags(true, false), ResetMode::Mixed);
        assert_eq!(ResetMode::from_flags(true, true), ResetMode::Hard);
        assert_eq!(ResetMode::from_flags(false, true), ResetMode::Hard);
    }

    #[test]
    fn mode_reach() {
        assert!(!ResetMode::Soft.resets_index());
        assert!(ResetMode::Mixed.resets_index());
        assert!(!ResetMode::Mixed.resets_working_tree());
        assert!(ResetMode::Hard.resets_working_tree());
    }
}
