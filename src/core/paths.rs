//! core::paths
//!
//! Storage locations used by confpatch inside a repository.
//!
//! # Layout
//!
//! - `<common_dir>/confpatch/config.toml` - repository configuration,
//!   shared by every linked worktree
//! - `<git_dir>/confpatch/lock` - exclusive lock for one working tree
//!
//! The lock is worktree-scoped because the protocols own a working tree and
//! the branch it follows, not the whole repository.
//!
//! ```
//! use confpatch::core::paths::ConfpatchPaths;
//! use std::path::PathBuf;
//!
//! let paths = ConfpatchPaths::new(
//!     PathBuf::from("/srv/.git/worktrees/lobby"),
//!     PathBuf::from("/srv/.git"),
//! );
//! assert_eq!(paths.repo_config_path(), PathBuf::from("/srv/.git/confpatch/config.toml"));
//! assert_eq!(paths.lock_path(), PathBuf::from("/srv/.git/worktrees/lobby/confpatch/lock"));
//! ```

use std::path::PathBuf;

use crate::git::RepoInfo;

const DIR_NAME: &str = "confpatch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfpatchPaths {
    /// Per-worktree git directory.
    pub git_dir: PathBuf,
    /// Shared git directory (equals `git_dir` outside linked worktrees).
    pub common_dir: PathBuf,
}

impl ConfpatchPaths {
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self::new(info.git_dir.clone(), info.common_dir.clone())
    }

    /// Repository-scoped storage directory.
    pub fn repo_dir(&self) -> PathBuf {
        self.common_dir.join(DIR_NAME)
    }

    /// Worktree-scoped storage directory.
    pub fn worktree_dir(&self) -> PathBuf {
        self.git_dir.join(DIR_NAME)
    }

    pub fn repo_config_path(&self) -> PathBuf {
        self.repo_dir().join("config.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.worktree_dir().join("lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_repo_shares_one_directory() {
        let paths = ConfpatchPaths::new(PathBuf::from("/r/.git"), PathBuf::from("/r/.git"));
        assert_eq!(paths.repo_dir(), paths.worktree_dir());
        assert_eq!(paths.lock_path(), PathBuf::from("/r/.git/confpatch/lock"));
    }

    #[test]
    fn linked_worktree_splits_config_and_lock() {
        let paths = ConfpatchPaths::new(
            PathBuf::from("/r/.git/worktrees/a"),
            PathBuf::from("/r/.git"),
        );
        assert_ne!(paths.repo_dir(), paths.worktree_dir());
        assert!(paths.repo_config_path().starts_with("/r/.git/confpatch"));
        assert!(paths.lock_path().starts_with("/r/.git/worktrees/a"));
    }
}
