//! protocol::patch
//!
//! Render tracked config files and commit the result as `[SUBST]`.
//!
//! # Algorithm
//!
//! 1. Reject a dirty working tree or an already substituted HEAD.
//! 2. Render every tracked file accepted by the [`FileFilter`].
//! 3. If rendering fails, hard-reset to HEAD and return the failure.
//! 4. If anything changed, stage the rendered files and commit.
//!
//! All or nothing: either one new commit exists and the working tree
//! matches it, or HEAD and the working tree are as they were.

use std::borrow::Cow;
use std::path::PathBuf;

use chrono::Local;

use super::errors::ProtocolError;
use super::head_state;
use crate::core::filter::FileFilter;
use crate::core::marker::substituted_subject;
use crate::core::types::Oid;
use crate::git::{Backend, ResetMode};
use crate::render::{environment_substitutions, substitute_placeholders, Substitutions};

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// A substitution commit was created.
    Committed { commit: Oid, files: Vec<PathBuf> },
    /// Every file rendered to its existing content; HEAD did not move.
    Unchanged,
}

impl PatchOutcome {
    pub fn commit(&self) -> Option<&Oid> {
        match self {
            PatchOutcome::Committed { commit, .. } => Some(commit),
            PatchOutcome::Unchanged => None,
        }
    }
}

/// Patch with the default suffix policy.
///
/// Without explicit `substitutions` the process environment is used.
pub fn substitute_and_commit<B: Backend + ?Sized>(
    backend: &B,
    substitutions: Option<&Substitutions>,
) -> Result<PatchOutcome, ProtocolError> {
    substitute_tracked_and_commit(backend, &FileFilter::default(), substitutions)
}

/// Render the tracked files accepted by `filter` and commit them.
pub fn substitute_tracked_and_commit<B: Backend + ?Sized>(
    backend: &B,
    filter: &FileFilter,
    substitutions: Option<&Substitutions>,
) -> Result<PatchOutcome, ProtocolError> {
    let work_dir = backend.work_dir().to_path_buf();

    if backend.is_dirty()? {
        return Err(ProtocolError::DirtyWorktree { path: work_dir });
    }
    let head = head_state(backend)?;
    if head.state.is_substituted() {
        return Err(ProtocolError::AlreadySubstituted {
            path: work_dir,
            commit: head.oid,
        });
    }

    let files = backend.tracked_files(filter)?;
    let substitutions: Cow<'_, Substitutions> = match substitutions {
        Some(map) => Cow::Borrowed(map),
        None => Cow::Owned(environment_substitutions()),
    };
    tracing::debug!(
        path = %work_dir.display(),
        files = files.len(),
        keys = substitutions.len(),
        "rendering tracked files"
    );

    let changed = match substitute_placeholders(&files, &substitutions) {
        Ok(changed) => changed,
        Err(source) => {
            tracing::warn!(path = %source.path.display(), "rendering failed, restoring HEAD");
            return match backend.reset(&head.oid, ResetMode::Hard) {
                Ok(()) => Err(ProtocolError::Substitute(source)),
                Err(reset) => Err(ProtocolError::RollbackFailed {
                    path: work_dir,
                    commit: head.oid,
                    source,
                    reset,
                }),
            };
        }
    };

    if !backend.is_dirty()? {
        tracing::info!(path = %work_dir.display(), "nothing to substitute");
        return Ok(PatchOutcome::Unchanged);
    }

    backend.stage(&files)?;
    let commit = backend.commit(&substituted_subject(&Local::now()))?;
    tracing::info!(
        path = %work_dir.display(),
        commit = %commit,
        changed = changed.len(),
        "substitution committed"
    );
    Ok(PatchOutcome::Committed {
        commit,
        files: changed,
    })
}
