//! cli
//!
//! Command-line interface layer for confpatch.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the diagnostic subscriber
//! - Delegate to command handlers
//!
//! The CLI layer is thin. Working trees are only changed through
//! [`crate::protocol`] and the [`crate::git`] adapter.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = commands::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Send diagnostics to stderr. `RUST_LOG` overrides the level.
fn init_tracing(debug: bool) {
    let default_level = if debug { "confpatch=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .ok();
}
