//! confpatch - keep templated and rendered config in one git history
//!
//! A configuration repository stores files with `{{ PLACEHOLDER }}` markers.
//! `patch` renders them in place and records a `[SUBST]` commit so a server
//! can run from the working tree. `unpatch` removes that commit again, and
//! any edits made to the live files survive as one ordinary commit written
//! against the placeholders.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`protocol`] - Patch and unpatch protocols
//! - [`render`] - Placeholder substitution engine
//! - [`core`] - Domain types, markers, config, paths and locking
//! - [`git`] - Version-control backend trait and its adapters
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Substitution state lives only in commit subjects
//! 2. A failed patch leaves HEAD and the working tree untouched
//! 3. Neither protocol creates an empty commit

pub mod cli;
pub mod core;
pub mod git;
pub mod protocol;
pub mod render;
pub mod ui;
