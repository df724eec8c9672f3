//! protocol::errors
//!
//! Typed failures of the patch and unpatch protocols.
//!
//! # Taxonomy
//!
//! - Precondition violations (`DirtyWorktree`, `AlreadySubstituted`,
//!   `NotSubstituted`, `DetachedHead`, `EmptyMessage`) are raised before any
//!   mutation and are safe to retry once fixed.
//! - Rendering failures (`Substitute`) abort the batch after the working tree
//!   has been reset to HEAD. `RollbackFailed` means that reset failed too.
//! - `RevertConflict` is raised after the interim commit exists. The
//!   repository needs manual attention.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::lock::LockError;
use crate::core::types::Oid;
use crate::git::GitError;
use crate::render::SubstituteError;

/// Errors from the patch and unpatch protocols.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("working tree {path} has uncommitted changes; commit or stash them before patching")]
    DirtyWorktree { path: PathBuf },

    #[error("HEAD {commit} in {path} is already substituted; unpatch it first")]
    AlreadySubstituted { path: PathBuf, commit: Oid },

    #[error("HEAD {commit} in {path} is not a substitution commit; nothing to unpatch")]
    NotSubstituted { path: PathBuf, commit: Oid },

    #[error("HEAD is detached at {commit} in {path}; unpatch needs a branch to rewrite")]
    DetachedHead { path: PathBuf, commit: Oid },

    #[error(
        "reverting substitution commit {commit} conflicts with the edits in interim commit {interim} ({}); \
         resolve manually",
        .paths.join(", ")
    )]
    RevertConflict {
        commit: Oid,
        interim: Oid,
        paths: Vec<String>,
    },

    #[error("commit message for {path} is empty")]
    EmptyMessage { path: PathBuf },

    #[error(transparent)]
    Substitute(#[from] SubstituteError),

    #[error("{source}; additionally, resetting {path} to {commit} failed: {reset}")]
    RollbackFailed {
        path: PathBuf,
        commit: Oid,
        source: SubstituteError,
        reset: GitError,
    },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Git(#[from] GitError),
}

impl ProtocolError {
    /// Whether the repository was left exactly as it was before the call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ProtocolError::DirtyWorktree { .. }
                | ProtocolError::AlreadySubstituted { .. }
                | ProtocolError::NotSubstituted { .. }
                | ProtocolError::DetachedHead { .. }
                | ProtocolError::EmptyMessage { .. }
                | ProtocolError::Lock(_)
        )
    }
}
