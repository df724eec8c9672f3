//! new-server command - Start an unrelated branch for a new server

use anyhow::{bail, Context as _, Result};

use super::{Context, Worktree};
use crate::core::types::BranchName;
use crate::git::Backend;
use crate::ui::output;

/// Create `revision` as a branch holding one empty root commit.
pub fn new_server(ctx: &Context, revision: &str, message: Option<&str>) -> Result<()> {
    let branch = BranchName::new(revision)?;
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| default_message(&branch));

    let cwd = ctx.cwd()?;
    let worktree = Worktree::open(&cwd)?;
    let _lock = worktree.lock()?;
    if worktree.git.is_dirty()? {
        bail!(
            "working tree {} has uncommitted changes; commit or stash them first",
            cwd.display()
        );
    }

    let commit = worktree
        .git
        .create_root_branch(&branch, &message)
        .with_context(|| format!("cannot create branch '{}'", branch))?;
    output::print(
        format!("created branch {} at {}", branch, commit.short(7)),
        ctx.verbosity(),
    );
    Ok(())
}

fn default_message(branch: &BranchName) -> String {
    format!("Initial commit for {}", branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_names_branch() {
        let branch = BranchName::new("survival-2").unwrap();
        assert_eq!(default_message(&branch), "Initial commit for survival-2");
    }
}
