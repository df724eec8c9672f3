//! status command - Show dirty and substituted state per working tree

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use super::{open_root, Context};
use crate::git::Backend;
use crate::protocol::is_substituted;
use crate::ui::output;

/// State of one requested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStatus {
    pub path: PathBuf,
    /// `false` when the path is not the root of a working tree.
    pub repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substituted: Option<bool>,
}

impl PathStatus {
    fn missing(path: PathBuf) -> Self {
        Self {
            path,
            repo: false,
            dirty: None,
            substituted: None,
        }
    }

    /// Human-readable state, e.g. `Dirty, Substituted`.
    pub fn describe(&self) -> String {
        if !self.repo {
            return "no such repo".to_string();
        }
        let mut state = vec![if self.dirty == Some(true) { "Dirty" } else { "Clean" }];
        if self.substituted == Some(true) {
            state.push("Substituted");
        }
        state.join(", ")
    }
}

/// Print the state of each working tree.
pub fn status(ctx: &Context, paths: &[PathBuf], json: bool) -> Result<()> {
    let shown: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };
    let resolved = ctx.resolve_paths(paths)?;

    let mut statuses = Vec::with_capacity(shown.len());
    for (shown, path) in shown.into_iter().zip(resolved) {
        statuses.push(inspect(shown, &path)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    let width = output::column_width(statuses.iter().map(|s| s.path.as_path()));
    for status in &statuses {
        output::print(
            format!(
                "{}\t{}",
                output::path_column(&status.path, width),
                status.describe()
            ),
            ctx.verbosity(),
        );
    }
    Ok(())
}

fn inspect(shown: PathBuf, path: &Path) -> Result<PathStatus> {
    let git = match open_root(path) {
        Ok(git) => git,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "not a working tree root");
            return Ok(PathStatus::missing(shown));
        }
    };
    Ok(PathStatus {
        path: shown,
        repo: true,
        dirty: Some(git.is_dirty()?),
        substituted: Some(is_substituted(&git)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(dirty: bool, substituted: bool) -> PathStatus {
        PathStatus {
            path: PathBuf::from("lobby"),
            repo: true,
            dirty: Some(dirty),
            substituted: Some(substituted),
        }
    }

    #[test]
    fn describe_states() {
        assert_eq!(status(false, false).describe(), "Clean");
        assert_eq!(status(true, false).describe(), "Dirty");
        assert_eq!(status(true, true).describe(), "Dirty, Substituted");
        assert_eq!(PathStatus::missing(PathBuf::from("x")).describe(), "no such repo");
    }

    #[test]
    fn missing_repo_serializes_without_state() {
        let json = serde_json::to_value(PathStatus::missing(PathBuf::from("x"))).unwrap();
        assert_eq!(json, serde_json::json!({"path": "x", "repo": false}));
    }
}
