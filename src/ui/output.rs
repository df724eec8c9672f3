//! ui::output
//!
//! User-facing output.
//!
//! Regular results go to stdout; progress, warnings and errors go to stderr so
//! that `status --json` stays machine-readable. Everything except errors
//! respects `--quiet`.

use std::fmt::Display;
use std::path::Path;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Print a result line to stdout.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{}", message);
    }
}

/// Print a progress line to stderr.
pub fn info(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("warning: {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Left-align `path` in a column `width` characters wide.
pub fn path_column(path: &Path, width: usize) -> String {
    format!("{:<width$}", path.display().to_string(), width = width)
}

/// Width of the widest displayed path.
pub fn column_width<'a>(paths: impl IntoIterator<Item = &'a Path>) -> usize {
    paths
        .into_iter()
        .map(|p| p.display().to_string().chars().count())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn paths_are_padded_to_widest() {
        let paths = [Path::new("lobby"), Path::new("survival-1")];
        let width = column_width(paths);
        assert_eq!(width, 10);
        assert_eq!(path_column(paths[0], width), "lobby     ");
        assert_eq!(path_column(paths[1], width), "survival-1");
    }

    #[test]
    fn empty_column_has_zero_width() {
        assert_eq!(column_width(std::iter::empty::<&Path>()), 0);
    }
}
