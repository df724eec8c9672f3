//! git::interface
//!
//! Production [`Backend`] implemented on `git2`.
//!
//! No other module imports `git2`. Errors are normalized into [`GitError`]
//! so the protocols can tell a revert conflict from a missing commit without
//! inspecting libgit2 error codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::backend::{Backend, ResetMode};
use crate::core::filter::FileFilter;
use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    #[error("reference {refname} already exists")]
    RefExists { refname: String },

    #[error("object not found: {oid}")]
    ObjectNotFound { oid: String },

    #[error("commit {commit} has no parent")]
    RootCommit { commit: Oid },

    /// HEAD points directly at a commit instead of a branch.
    #[error("HEAD is detached at {commit}")]
    DetachedHead { commit: Oid },

    /// Reverting a commit against HEAD produced conflicts.
    #[error("reverting {commit} conflicts in: {}", .paths.join(", "))]
    RevertConflict { commit: Oid, paths: Vec<String> },

    /// Git operation in progress (merge, revert, ...).
    #[error("{operation} in progress")]
    OperationInProgress { operation: GitState },

    #[error("invalid object id: {oid}")]
    InvalidOid { oid: String },

    #[error("path {path} is outside the working tree {work_dir}")]
    OutsideWorkTree { path: PathBuf, work_dir: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    /// Create a GitError from a git2::Error with context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) => GitError::Internal { message: msg },
        }
    }
}

/// Locations of a repository on disk.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Per-worktree .git directory
    pub git_dir: PathBuf,
    /// Shared .git directory
    pub common_dir: PathBuf,
    /// Working directory root
    pub work_dir: PathBuf,
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Rebase,
    Merge,
    CherryPick,
    Revert,
    Bisect,
    ApplyMailbox,
}

impl GitState {
    /// ```
    /// use confpatch::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Revert.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

const FALLBACK_NAME: &str = "confpatch";
const FALLBACK_EMAIL: &str = "confpatch@localhost";

/// The git2-backed repository handle.
pub struct Git {
    repo: git2::Repository,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// `path` may be any directory inside the working tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();
        Ok(Self { repo, work_dir })
    }

    pub fn info(&self) -> RepoInfo {
        RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir: self.work_dir.clone(),
        }
    }

    /// Get the current Git state (merge, revert, ...).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Fail if a merge/revert/rebase is waiting for the user.
    pub fn ensure_no_operation_in_progress(&self) -> Result<(), GitError> {
        match self.state() {
            GitState::Clean => Ok(()),
            operation => Err(GitError::OperationInProgress { operation }),
        }
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// Working tree status, ignoring untracked files.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }

        Ok(result)
    }

    // =========================================================================
    // Refs
    // =========================================================================

    pub fn ref_exists(&self, refname: &str) -> bool {
        self.repo.find_reference(refname).is_ok()
    }

    /// Current branch, or `None` when HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }
        Ok(None)
    }

    /// Create `branch` holding a single parentless commit with an empty tree.
    ///
    /// HEAD, the index and the working tree are left alone.
    pub fn create_root_branch(&self, branch: &BranchName, message: &str) -> Result<Oid, GitError> {
        let refname = branch.ref_name();
        if self.ref_exists(&refname) {
            return Err(GitError::RefExists { refname });
        }

        let tree_id = self.repo.treebuilder(None)?.write()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some(&refname), &sig, &sig, message, &tree, &[])
            .map_err(|e| GitError::from_git2(e, &refname))?;
        to_oid(oid)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let git_oid = git2::Oid::from_str(oid.as_str())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        self.repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn head_commit(&self) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    /// Relative paths of regular files in the HEAD tree.
    fn head_blobs(&self) -> Result<Vec<PathBuf>, GitError> {
        let tree = self.head_commit()?.tree()?;
        let mut files = Vec::new();

        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) && entry.filemode() != SYMLINK_MODE {
                if let Some(name) = entry.name() {
                    files.push(Path::new(root).join(name));
                }
            }
            git2::TreeWalkResult::Ok
        })?;

        Ok(files)
    }

    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(git2::Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?),
        }
    }

    fn relative<'p>(&self, path: &'p Path) -> Result<&'p Path, GitError> {
        if path.is_relative() {
            return Ok(path);
        }
        path.strip_prefix(&self.work_dir)
            .map_err(|_| GitError::OutsideWorkTree {
                path: path.to_path_buf(),
                work_dir: self.work_dir.clone(),
            })
    }

    fn commit_tree(
        &self,
        tree: &git2::Tree<'_>,
        message: &str,
        parent: &git2::Commit<'_>,
    ) -> Result<Oid, GitError> {
        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, tree, &[parent])
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        to_oid(oid)
    }
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

fn conflict_path(conflict: &git2::IndexConflict) -> String {
    conflict
        .our
        .as_ref()
        .or(conflict.their.as_ref())
        .or(conflict.ancestor.as_ref())
        .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
        .unwrap_or_default()
}

const SYMLINK_MODE: i32 = 0o120000;

impl Backend for Git {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn head(&self) -> Result<Oid, GitError> {
        to_oid(self.head_commit()?.id())
    }

    fn parent(&self, commit: &Oid) -> Result<Oid, GitError> {
        let found = self.find_commit(commit)?;
        match found.parent_id(0) {
            Ok(parent) => to_oid(parent),
            Err(_) => Err(GitError::RootCommit {
                commit: commit.clone(),
            }),
        }
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        Ok(!self.worktree_status()?.is_clean())
    }

    fn is_head_detached(&self) -> Result<bool, GitError> {
        self.repo
            .head_detached()
            .map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    fn tracked_files(&self, filter: &FileFilter) -> Result<Vec<PathBuf>, GitError> {
        Ok(self
            .head_blobs()?
            .into_iter()
            .filter(|rel| filter.matches(rel))
            .map(|rel| self.work_dir.join(rel))
            .filter(|abs| abs.exists())
            .collect())
    }

    fn head_files(&self) -> Result<Vec<PathBuf>, GitError> {
        Ok(self
            .head_blobs()?
            .into_iter()
            .map(|rel| self.work_dir.join(rel))
            .collect())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        for path in paths {
            let rel = self.relative(path)?;
            if self.work_dir.join(rel).exists() {
                index.add_path(rel)?;
            } else {
                index.remove_path(rel)?;
            }
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, subject: &str) -> Result<Oid, GitError> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.head_commit()?;
        self.commit_tree(&tree, subject, &parent)
    }

    fn commit_subject(&self, commit: &Oid) -> Result<String, GitError> {
        Ok(self.find_commit(commit)?.summary().unwrap_or("").to_string())
    }

    fn resolve(&self, rev: &str) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, rev))?;
        to_oid(commit.id())
    }

    fn reset(&self, target: &Oid, mode: ResetMode) -> Result<(), GitError> {
        let commit = self.find_commit(target)?;
        let kind = match mode {
            ResetMode::Soft => git2::ResetType::Soft,
            ResetMode::Mixed => git2::ResetType::Mixed,
            ResetMode::Hard => git2::ResetType::Hard,
        };
        self.repo
            .reset(commit.as_object(), kind, None)
            .map_err(|e| GitError::from_git2(e, target.as_str()))
    }

    fn revert(&self, commit: &Oid) -> Result<Oid, GitError> {
        let target = self.find_commit(commit)?;
        let head = self.head_commit()?;

        let mut index = self.repo.revert_commit(&target, &head, 0, None)?;
        if index.has_conflicts() {
            let paths = index
                .conflicts()?
                .filter_map(Result::ok)
                .map(|c| conflict_path(&c))
                .collect();
            return Err(GitError::RevertConflict {
                commit: commit.clone(),
                paths,
            });
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {}.\n",
            target.summary().unwrap_or(""),
            commit
        );
        let reverted = self.commit_tree(&tree, &message, &head)?;

        let new_head = self.find_commit(&reverted)?;
        self.repo
            .reset(new_head.as_object(), git2::ResetType::Hard, None)
            .map_err(|e| GitError::from_git2(e, reverted.as_str()))?;
        Ok(reverted)
    }

    fn move_branch_ref(&self, target: &Oid) -> Result<(), GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        if !head.is_branch() {
            return Err(GitError::DetachedHead {
                commit: self.head()?,
            });
        }
        let refname = head.name().ok_or_else(|| GitError::Internal {
            message: "branch name is not valid UTF-8".to_string(),
        })?;
        let git_oid = git2::Oid::from_str(target.as_str())
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;
        self.repo
            .reference(refname, git_oid, true, "confpatch: move branch")
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(())
    }
}
