//! protocol
//!
//! The two operations that move a working tree between its templated and
//! rendered forms.
//!
//! # Lifecycle
//!
//! ```text
//! templated HEAD --patch--> [SUBST] HEAD --(edits)--> unpatch --> templated HEAD
//! ```
//!
//! - [`patch::substitute_tracked_and_commit`] renders tracked config files
//!   and records the result as a single `[SUBST]` commit.
//! - [`unpatch::commit_and_unsubstitute`] removes that commit again, folding
//!   any edits made on top of it into one commit expressed in placeholder
//!   syntax.
//!
//! # Invariants
//!
//! - The only persisted state is the marker in commit subjects
//! - Precondition failures leave the repository untouched
//! - Neither protocol creates an empty commit
//!
//! Both functions are generic over [`Backend`] and assume the caller holds
//! exclusive access to the working tree for the duration of the call.

pub mod errors;
pub mod patch;
pub mod unpatch;

pub use errors::ProtocolError;
pub use patch::{substitute_and_commit, substitute_tracked_and_commit, PatchOutcome};
pub use unpatch::{commit_and_unsubstitute, UnpatchOutcome, UnpatchState, Unpatcher};

use crate::core::marker::TaggedCommit;
use crate::git::{Backend, GitError};

/// HEAD together with its classified state.
pub fn head_state<B: Backend + ?Sized>(backend: &B) -> Result<TaggedCommit, GitError> {
    let head = backend.head()?;
    let subject = backend.commit_subject(&head)?;
    Ok(TaggedCommit::new(head, subject))
}

/// Whether HEAD is a substitution commit.
pub fn is_substituted<B: Backend + ?Sized>(backend: &B) -> Result<bool, GitError> {
    Ok(head_state(backend)?.state.is_substituted())
}
