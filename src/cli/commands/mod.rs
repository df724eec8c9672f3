//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves the working trees it was given
//! 2. Takes the worktree lock for anything that writes
//! 3. Calls into [`crate::protocol`] or [`crate::git`]
//! 4. Formats and displays output
//!
//! Paths are handled one at a time; the first failure aborts the run.

mod completion;
mod config_cmd;
mod new_server;
mod patch;
mod status;
mod unpatch;

pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use new_server::new_server;
pub use patch::patch;
pub use status::{status, PathStatus};
pub use unpatch::unpatch;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use super::args::{Command, ConfigAction};
use crate::core::config::Config;
use crate::core::lock::WorktreeLock;
use crate::core::paths::ConfpatchPaths;
use crate::git::Git;
use crate::ui::output::Verbosity;

/// Execution context shared by all handlers.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Directory relative paths are resolved against.
    pub fn cwd(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }

    /// Resolve command-line paths, defaulting to the working directory.
    pub fn resolve_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let cwd = self.cwd()?;
        if paths.is_empty() {
            return Ok(vec![cwd]);
        }
        Ok(paths.iter().map(|p| cwd.join(p)).collect())
    }
}

/// A working tree opened for one command, with its config.
pub struct Worktree {
    pub git: Git,
    pub paths: ConfpatchPaths,
    pub config: Config,
}

impl Worktree {
    /// Open `path`, which must be the root of a git working tree.
    pub fn open(path: &Path) -> Result<Self> {
        let git = open_root(path)?;
        let paths = ConfpatchPaths::from_repo_info(&git.info());
        let config = Config::load(Some(&paths))
            .with_context(|| format!("cannot load configuration for {}", path.display()))?;
        Ok(Self { git, paths, config })
    }

    /// Lock the working tree and make sure git itself is idle.
    pub fn lock(&self) -> Result<WorktreeLock> {
        let lock = WorktreeLock::acquire(&self.paths)?;
        self.git.ensure_no_operation_in_progress()?;
        Ok(lock)
    }
}

/// Open the repository whose working tree root is exactly `path`.
pub fn open_root(path: &Path) -> Result<Git> {
    let git = Git::open(path)?;
    ensure_root(path, git.info().work_dir.as_path())?;
    Ok(git)
}

fn ensure_root(path: &Path, work_dir: &Path) -> Result<()> {
    let requested = path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", path.display()))?;
    let root = work_dir
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", work_dir.display()))?;
    if requested != root {
        bail!(
            "{} is not the root of a git working tree (the root is {})",
            path.display(),
            root.display()
        );
    }
    Ok(())
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Patch { paths, set } => patch(ctx, &paths, &set),
        Command::Unpatch { paths, message } => unpatch(ctx, &paths, message.as_deref()),
        Command::Status { paths, json } => status(ctx, &paths, json),
        Command::NewServer { revision, message } => {
            new_server(ctx, &revision, message.as_deref())
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_get(ctx, &key),
            ConfigAction::Set { key, value } => config_set(ctx, &key, &value),
            ConfigAction::List => config_list(ctx),
        },
        Command::Completion { shell } => completion(shell),
    }
}
