//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. The protocols are written
//! against the [`Backend`] trait; [`Git`] implements it on top of `git2`
//! and [`mock::MockRepo`] implements it in memory for tests. No other module
//! imports `git2`.
//!
//! # Invariants
//!
//! - Reverts never prompt; a conflicting revert fails before touching the tree
//! - Branch refs are only moved while HEAD is attached
//! - All operations return strong types ([`crate::core::types::Oid`])
//!
//! # Example
//!
//! ```ignore
//! use confpatch::git::{Backend, Git};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.head()?;
//! println!("{}", git.commit_subject(&head)?);
//! ```

pub mod backend;
mod interface;
pub mod mock;

pub use backend::{Backend, ResetMode};
pub use interface::{Git, GitError, GitState, RepoInfo, WorktreeStatus};
