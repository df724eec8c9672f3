//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// confpatch - keep templated and rendered config in one git history
#[derive(Parser, Debug)]
#[command(name = "confpatch")]
#[command(author, version, about, long_about = None)]
#[command(infer_subcommands = true)]
pub struct Cli {
    /// Run as if confpatch was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render placeholders in tracked config files and commit the result
    #[command(
        name = "patch",
        long_about = "Render placeholders in tracked config files and commit the result.\n\n\
            Every tracked file whose suffix passes the configured filter is rendered \
            with the process environment (plus any --set pairs) as the variable \
            namespace. The rendered tree is recorded as a single [SUBST] commit. \
            If any file fails to render, the working tree is reset and nothing is \
            committed.",
        after_help = "\
EXAMPLES:
    # Render the repository in the current directory
    confpatch patch

    # Render several server directories, overriding one value
    confpatch patch lobby survival --set MOTD='Maintenance tonight'"
    )]
    Patch {
        /// Working tree roots to patch (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Extra substitution, overriding the environment
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        set: Vec<(String, String)>,
    },

    /// Undo the substitution commit, keeping edits made on top of it
    #[command(
        name = "unpatch",
        long_about = "Undo the substitution commit, keeping edits made on top of it.\n\n\
            Without edits, the [SUBST] commit is dropped and placeholders are restored. \
            With edits, they are folded into a single commit on top of the templated \
            history, expressed with placeholders intact.",
        after_help = "\
EXAMPLES:
    # Unpatch with the default message
    confpatch unpatch

    # Unpatch two servers with a custom message
    confpatch unpatch lobby survival -m 'Raise view distance'"
    )]
    Unpatch {
        /// Working tree roots to unpatch (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Message for the commit holding the folded edits
        #[arg(short = 'm', long = "msg", visible_alias = "commit-message", value_name = "MSG")]
        message: Option<String>,
    },

    /// Show whether each working tree is dirty and substituted
    #[command(name = "status")]
    Status {
        /// Working tree roots to inspect (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a branch holding a single empty root commit
    #[command(
        name = "new-server",
        long_about = "Create a branch holding a single empty root commit.\n\n\
            The branch shares no history with the current one. HEAD is not moved; \
            check the branch out yourself once it exists."
    )]
    NewServer {
        /// Name of the branch to create
        revision: String,

        /// Message of the root commit
        message: Option<String>,
    },

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        after_help = "\
EXAMPLES:
    confpatch config list
    confpatch config get include_suffixes
    confpatch config set exclude_suffixes .local.yml,.secret.yml
    confpatch config set message_prefix 'Sync config'"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash (add to ~/.bashrc)
    confpatch completion bash >> ~/.bashrc

    # Zsh
    confpatch completion zsh > ~/.zfunc/_confpatch"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
