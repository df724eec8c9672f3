//! unpatch command - Fold edits back into templated history

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::Local;

use super::{Context, Worktree};
use crate::protocol::{commit_and_unsubstitute, ProtocolError, UnpatchOutcome};
use crate::ui::output;

/// Unpatch each working tree in turn.
pub fn unpatch(ctx: &Context, paths: &[PathBuf], message: Option<&str>) -> Result<()> {
    let verbosity = ctx.verbosity();

    for path in ctx.resolve_paths(paths)? {
        output::info(format!("Unpatching {}...", path.display()), verbosity);
        let worktree = Worktree::open(&path)?;
        let _lock = worktree.lock()?;
        let message = match message {
            Some(m) => m.to_string(),
            None => default_message(worktree.config.message_prefix()),
        };

        let outcome = match commit_and_unsubstitute(&worktree.git, &message) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let ProtocolError::RevertConflict { interim, .. } = &err {
                    output::warn(
                        format!(
                            "edits are kept in {} on the branch; resolve by hand",
                            interim.short(7)
                        ),
                        verbosity,
                    );
                }
                return Err(err).with_context(|| format!("unpatch failed for {}", path.display()));
            }
        };

        let line = match outcome {
            UnpatchOutcome::Discarded { .. } => "no edits, substitution dropped".to_string(),
            UnpatchOutcome::NoNetChange { .. } => "edits cancel out, nothing committed".to_string(),
            UnpatchOutcome::Committed { commit } => format!("committed edits as {}", commit.short(7)),
        };
        output::print(format!("{}: {}", path.display(), line), verbosity);
    }
    Ok(())
}

fn default_message(prefix: &str) -> String {
    format!("{} {}", prefix, Local::now().format("%Y-%m-%d"))
}
