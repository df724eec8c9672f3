//! protocol::unpatch
//!
//! Remove a `[SUBST]` commit, keeping whatever was edited on top of it.
//!
//! # State machine
//!
//! ```text
//!            clean tree
//! Ready ─────────────────────────────────────────────► Done(Discarded)
//!   │ dirty tree: commit [CHNG]
//!   ▼
//! AwaitingRevert ──revert sub──► Folding ──clean──► Done(NoNetChange)
//!                                   │
//!                                   └──dirty: commit──► Done(Committed)
//! ```
//!
//! Any failing transition moves the machine to `Failed`, remembering the
//! state it failed in. There are no recovery transitions; a failure after
//! the `[CHNG]` commit leaves that commit on the branch for manual repair.
//!
//! # Folding
//!
//! After the revert the branch is moved back to `presub` with a soft reset.
//! The index and working tree still hold `revert(sub)` applied on top of the
//! interim edits, so the staged diff against `presub` is exactly what the
//! user changed, in placeholder syntax.

use super::errors::ProtocolError;
use super::head_state;
use crate::core::marker::INTERIM_MARKER;
use crate::core::types::Oid;
use crate::git::{Backend, GitError, ResetMode};

/// How an unpatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpatchOutcome {
    /// No edits were made; the substitution commit was dropped.
    Discarded { presub: Oid },
    /// Edits cancelled out against the substitution; nothing to commit.
    NoNetChange { presub: Oid },
    /// Edits were folded into a new commit on top of `presub`.
    Committed { commit: Oid },
}

impl UnpatchOutcome {
    /// Commit HEAD points at afterwards.
    pub fn head(&self) -> &Oid {
        match self {
            UnpatchOutcome::Discarded { presub } | UnpatchOutcome::NoNetChange { presub } => presub,
            UnpatchOutcome::Committed { commit } => commit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpatchState {
    /// Preconditions hold; nothing has been written yet.
    Ready { presub: Oid, sub: Oid },
    /// Edits are snapshotted in `interim`; `sub` still needs reverting.
    AwaitingRevert { presub: Oid, sub: Oid, interim: Oid },
    /// `sub` is reverted; the branch still needs to move back to `presub`.
    Folding { presub: Oid, revert: Oid },
    Done(UnpatchOutcome),
    Failed { last: Box<UnpatchState> },
}

impl UnpatchState {
    pub fn name(&self) -> &'static str {
        match self {
            UnpatchState::Ready { .. } => "ready",
            UnpatchState::AwaitingRevert { .. } => "awaiting-revert",
            UnpatchState::Folding { .. } => "folding",
            UnpatchState::Done(_) => "done",
            UnpatchState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UnpatchState::Done(_) | UnpatchState::Failed { .. })
    }
}

/// Drives one unpatch through its states.
pub struct Unpatcher<'a, B: Backend + ?Sized> {
    backend: &'a B,
    message: String,
    state: UnpatchState,
}

impl<'a, B: Backend + ?Sized> Unpatcher<'a, B> {
    /// Check preconditions and build a machine in the `Ready` state.
    ///
    /// Nothing is written when this fails.
    pub fn new(backend: &'a B, message: impl Into<String>) -> Result<Self, ProtocolError> {
        let message = message.into();
        let path = backend.work_dir().to_path_buf();

        let head = head_state(backend)?;
        if !head.state.is_substituted() {
            return Err(ProtocolError::NotSubstituted {
                path,
                commit: head.oid,
            });
        }
        if backend.is_head_detached()? {
            return Err(ProtocolError::DetachedHead {
                path,
                commit: head.oid,
            });
        }
        if message.trim().is_empty() {
            return Err(ProtocolError::EmptyMessage { path });
        }
        let presub = backend.parent(&head.oid)?;

        Ok(Self {
            backend,
            message,
            state: UnpatchState::Ready {
                presub,
                sub: head.oid,
            },
        })
    }

    pub fn state(&self) -> &UnpatchState {
        &self.state
    }

    /// Perform one transition. Terminal states are left as they are.
    pub fn step(&mut self) -> Result<&UnpatchState, ProtocolError> {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }
        let current = self.state.clone();
        match self.transition(&current) {
            Ok(next) => {
                tracing::debug!(from = current.name(), to = next.name(), "unpatch transition");
                self.state = next;
                Ok(&self.state)
            }
            Err(err) => {
                tracing::warn!(state = current.name(), error = %err, "unpatch failed");
                self.state = UnpatchState::Failed {
                    last: Box::new(current),
                };
                Err(err)
            }
        }
    }

    /// Step until a terminal state is reached.
    pub fn run(mut self) -> Result<UnpatchOutcome, ProtocolError> {
        loop {
            if let UnpatchState::Done(outcome) = self.step()? {
                return Ok(outcome.clone());
            }
        }
    }

    fn transition(&self, state: &UnpatchState) -> Result<UnpatchState, ProtocolError> {
        let backend = self.backend;
        match state {
            UnpatchState::Ready { presub, sub } => {
                if !backend.is_dirty()? {
                    backend.move_branch_ref(presub)?;
                    backend.reset(presub, ResetMode::Hard)?;
                    return Ok(UnpatchState::Done(UnpatchOutcome::Discarded {
                        presub: presub.clone(),
                    }));
                }
                // Missing files are staged too, so deletions reach the snapshot.
                let tracked = backend.head_files()?;
                backend.stage(&tracked)?;
                let interim = backend.commit(INTERIM_MARKER)?;
                Ok(UnpatchState::AwaitingRevert {
                    presub: presub.clone(),
                    sub: sub.clone(),
                    interim,
                })
            }

            UnpatchState::AwaitingRevert {
                presub,
                sub,
                interim,
            } => match backend.revert(sub) {
                Ok(revert) => Ok(UnpatchState::Folding {
                    presub: presub.clone(),
                    revert,
                }),
                Err(GitError::RevertConflict { paths, .. }) => Err(ProtocolError::RevertConflict {
                    commit: sub.clone(),
                    interim: interim.clone(),
                    paths,
                }),
                Err(e) => Err(e.into()),
            },

            UnpatchState::Folding { presub, .. } => {
                backend.move_branch_ref(presub)?;
                backend.reset(presub, ResetMode::Soft)?;
                if !backend.is_dirty()? {
                    return Ok(UnpatchState::Done(UnpatchOutcome::NoNetChange {
                        presub: presub.clone(),
                    }));
                }
                let commit = backend.commit(&self.message)?;
                Ok(UnpatchState::Done(UnpatchOutcome::Committed { commit }))
            }

            UnpatchState::Done(_) | UnpatchState::Failed { .. } => Ok(state.clone()),
        }
    }
}

/// Unsubstitute HEAD, committing any edits with `message`.
pub fn commit_and_unsubstitute<B: Backend + ?Sized>(
    backend: &B,
    message: &str,
) -> Result<UnpatchOutcome, ProtocolError> {
    let outcome = Unpatcher::new(backend, message)?.run()?;
    tracing::info!(
        path = %backend.work_dir().display(),
        head = %outcome.head(),
        "unpatched"
    );
    Ok(outcome)
}
