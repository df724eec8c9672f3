//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use super::Context;
use crate::core::config::{Config, KEYS};
use crate::core::paths::ConfpatchPaths;
use crate::git::Git;
use crate::ui::output;

/// Storage paths of the repository around the working directory, if any.
fn repo_paths(ctx: &Context) -> Result<Option<ConfpatchPaths>> {
    let cwd = ctx.cwd()?;
    Ok(Git::open(&cwd)
        .ok()
        .map(|git| ConfpatchPaths::from_repo_info(&git.info())))
}

/// Get a configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let paths = repo_paths(ctx)?;
    let config = Config::load(paths.as_ref()).context("failed to load config")?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let paths = repo_paths(ctx)?;
    let mut config = Config::load(paths.as_ref()).context("failed to load config")?;

    let written = config.set(paths.as_ref(), key, value)?;
    output::print(
        format!("set {} = {} ({})", key, config.get(key)?, written.display()),
        ctx.verbosity(),
    );
    Ok(())
}

/// List all configuration values.
pub fn list(ctx: &Context) -> Result<()> {
    let paths = repo_paths(ctx)?;
    let config = Config::load(paths.as_ref()).context("failed to load config")?;

    let source = |p: Option<&std::path::Path>| match p {
        Some(p) => p.display().to_string(),
        None => "(defaults)".to_string(),
    };
    println!("# global: {}", source(config.global_config_loaded_from()));
    println!("# repo: {}", source(config.repo_config_loaded_from()));
    for key in KEYS {
        println!("{} = {}", key, config.get(key)?);
    }
    Ok(())
}
