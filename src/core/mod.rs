//! core
//!
//! Core domain types, schemas, and support code for confpatch.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid
//! - [`marker`] - Substitution state encoded in commit subjects
//! - [`filter`] - Which tracked files take part in substitution
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Where confpatch keeps its files inside a repository
//! - [`lock`] - Exclusive lock over one working tree
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Classification is a pure function of commit data

pub mod config;
pub mod filter;
pub mod lock;
pub mod marker;
pub mod paths;
pub mod types;
