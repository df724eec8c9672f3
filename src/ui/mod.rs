//! ui
//!
//! User interaction utilities.
//!
//! All terminal output of the CLI goes through [`output`], which applies the
//! `--quiet`/`--debug` verbosity consistently. Internal diagnostics use
//! `tracing` instead.

pub mod output;
