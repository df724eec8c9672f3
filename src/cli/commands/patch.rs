//! patch command - Render placeholders and commit as [SUBST]

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Context, Worktree};
use crate::protocol::{substitute_tracked_and_commit, PatchOutcome};
use crate::render::{environment_substitutions, Substitutions};
use crate::ui::output;

/// Patch each working tree in turn.
pub fn patch(ctx: &Context, paths: &[PathBuf], overrides: &[(String, String)]) -> Result<()> {
    let verbosity = ctx.verbosity();
    let substitutions = substitution_map(environment_substitutions(), overrides);

    for path in ctx.resolve_paths(paths)? {
        let worktree = Worktree::open(&path)?;
        let _lock = worktree.lock()?;
        let filter = worktree.config.file_filter();
        output::info(format!("Patching {}...", path.display()), verbosity);

        let outcome = substitute_tracked_and_commit(&worktree.git, &filter, Some(&substitutions))
            .with_context(|| format!("patch failed for {}", path.display()))?;

        match outcome {
            PatchOutcome::Committed { commit, files } => {
                for file in &files {
                    output::debug(format!("rendered {}", file.display()), verbosity);
                }
                output::print(
                    format!(
                        "{}: substituted {} file(s) in {}",
                        path.display(),
                        files.len(),
                        commit.short(7)
                    ),
                    verbosity,
                )
            }
            PatchOutcome::Unchanged => output::print(
                format!("{}: nothing to substitute", path.display()),
                verbosity,
            ),
        }
    }
    Ok(())
}

/// The environment overlaid with `--set` pairs.
fn substitution_map(mut base: Substitutions, overrides: &[(String, String)]) -> Substitutions {
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
    base
}
