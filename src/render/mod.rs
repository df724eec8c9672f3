//! render
//!
//! Placeholder substitution engine.
//!
//! # Template syntax
//!
//! Files are rendered with `minijinja`. Variables keep the usual `{{ NAME }}`
//! delimiters, while blocks and comments use `<<<% ... %>>>` and
//! `<<<# ... #>>>` so that config formats which already use `{%`/`{#`
//! survive untouched. Referencing a name missing from the substitution map
//! is an error, never an empty string.
//!
//! # Whitespace
//!
//! Rendering may eat trailing newlines. The trailing whitespace run of the
//! rendered text is replaced by the run of the original text, so a file that
//! ended in `k` whitespace characters still ends in exactly those `k`.
//!
//! # Batches
//!
//! [`substitute_placeholders`] rewrites files in order and stops at the first
//! failure. Files rewritten earlier in the batch stay rewritten; restoring
//! them is the caller's job.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};
use thiserror::Error;

/// Placeholder name to replacement value.
pub type Substitutions = BTreeMap<String, String>;

pub const BLOCK_START: &str = "<<<%";
pub const BLOCK_END: &str = "%>>>";
pub const VARIABLE_START: &str = "{{";
pub const VARIABLE_END: &str = "}}";
pub const COMMENT_START: &str = "<<<#";
pub const COMMENT_END: &str = "#>>>";

/// Why a single file could not be substituted.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot read file: {0}")]
    Read(#[source] std::io::Error),

    #[error("file is not valid UTF-8")]
    NotUtf8,

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("cannot write file: {0}")]
    Write(#[source] std::io::Error),
}

/// A substitution failure scoped to the offending file.
#[derive(Debug, Error)]
#[error("error substituting file {path}: {source}")]
pub struct SubstituteError {
    pub path: PathBuf,
    #[source]
    pub source: RenderError,
}

/// Build a substitution map from the process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
pub fn environment_substitutions() -> Substitutions {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Template renderer configured with the confpatch delimiters.
pub struct Renderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters(BLOCK_START, BLOCK_END)
            .variable_delimiters(VARIABLE_START, VARIABLE_END)
            .comment_delimiters(COMMENT_START, COMMENT_END)
            .build()?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Ok(Self { env })
    }

    /// Render `source` and restore the original trailing whitespace.
    pub fn render(&self, source: &str, substitutions: &Substitutions) -> Result<String, RenderError> {
        let rendered = self.env.render_str(source, substitutions)?;
        Ok(splice_trailing_whitespace(source, &rendered))
    }

    /// Render one file in place. Returns whether the file content changed.
    ///
    /// The file is only written when the rendered bytes differ.
    pub fn render_file(&self, path: &Path, substitutions: &Substitutions) -> Result<bool, RenderError> {
        let bytes = fs::read(path).map_err(RenderError::Read)?;
        let original = String::from_utf8(bytes).map_err(|_| RenderError::NotUtf8)?;
        let rendered = self.render(&original, substitutions)?;
        if rendered == original {
            return Ok(false);
        }
        fs::write(path, rendered.as_bytes()).map_err(RenderError::Write)?;
        Ok(true)
    }
}

/// Rewrite every file with its rendered content, stopping at the first error.
///
/// Returns the files whose content changed.
pub fn substitute_placeholders(
    files: &[PathBuf],
    substitutions: &Substitutions,
) -> Result<Vec<PathBuf>, SubstituteError> {
    let renderer = Renderer::new().map_err(|source| SubstituteError {
        path: PathBuf::new(),
        source,
    })?;

    let mut changed = Vec::new();
    for path in files {
        let wrote = renderer
            .render_file(path, substitutions)
            .map_err(|source| SubstituteError {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), changed = wrote, "rendered");
        if wrote {
            changed.push(path.clone());
        }
    }
    Ok(changed)
}

/// Whitespace characters considered part of a trailing run.
fn is_trailing_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// The trailing whitespace run of `content` (possibly empty).
///
/// ```
/// use confpatch::render::trailing_whitespace;
///
/// assert_eq!(trailing_whitespace(""), "");
/// assert_eq!(trailing_whitespace("abc\ndef"), "");
/// assert_eq!(trailing_whitespace("abc\ndef\n"), "\n");
/// assert_eq!(trailing_whitespace("abc\n\n\n"), "\n\n\n");
/// ```
pub fn trailing_whitespace(content: &str) -> &str {
    let body = content.trim_end_matches(is_trailing_ws);
    &content[body.len()..]
}

/// Replace the trailing whitespace of `rendered` with that of `original`.
pub fn splice_trailing_whitespace(original: &str, rendered: &str) -> String {
    let body = rendered.trim_end_matches(is_trailing_ws);
    let tail = trailing_whitespace(original);
    let mut out = String::with_capacity(body.len() + tail.len());
    out.push_str(body);
    out.push_str(tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn subs(pairs: &[(&str, &str)]) -> Substitutions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn render(source: &str, pairs: &[(&str, &str)]) -> Result<String, RenderError> {
        Renderer::new().unwrap().render(source, &subs(pairs))
    }

    #[test]
    fn basic_placeholder() {
        let out = render("PASSWORD: {{ TESTKEY }}", &[("TESTKEY", "TESTVALUE")]).unwrap();
        assert_eq!(out, "PASSWORD: TESTVALUE");
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = render("PASSWORD: {{ NOPE }}", &[("TESTKEY", "TESTVALUE")]).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn syntax_error_is_an_error() {
        let err = render("value: {{ unterminated", &[]).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn custom_block_and_comment_delimiters() {
        let source = "<<<# comment #>>><<<% if MODE == \"prod\" %>>>live<<<% else %>>>dev<<<% endif %>>>\n";
        let out = render(source, &[("MODE", "prod")]).unwrap();
        assert_eq!(out, "live\n");
    }

    #[test]
    fn jinja_block_syntax_is_left_alone() {
        let source = "format: \"{% raw %}{#x}\"\n";
        assert_eq!(render(source, &[]).unwrap(), source);
    }

    #[test]
    fn trailing_newlines_are_preserved() {
        let out = render("a: {{ A }}\n\n\n", &[("A", "1")]).unwrap();
        assert_eq!(out, "a: 1\n\n\n");
    }

    #[test]
    fn missing_trailing_whitespace_is_not_added() {
        let out = render("a: {{ A }}", &[("A", "1\n\n")]).unwrap();
        assert_eq!(out, "a: 1");
    }

    #[test]
    fn splice_with_empty_rendered_tail_keeps_body() {
        assert_eq!(splice_trailing_whitespace("x\n", "rendered"), "rendered\n");
        assert_eq!(splice_trailing_whitespace("x", "rendered"), "rendered");
    }

    #[test]
    fn vertical_tab_counts_as_whitespace() {
        assert_eq!(trailing_whitespace("a\x0b\n"), "\x0b\n");
    }

    #[test]
    fn unchanged_files_are_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty.txt");
        let plain = temp.path().join("plain.txt");
        fs::write(&empty, "").unwrap();
        fs::write(&plain, "This is just a random string").unwrap();

        let files = vec![empty.clone(), plain.clone()];
        let before: Vec<_> = files.iter().map(|f| fs::metadata(f).unwrap().modified().unwrap()).collect();

        for map in [subs(&[]), subs(&[("TESTKEY", "TESTVALUE")])] {
            let changed = substitute_placeholders(&files, &map).unwrap();
            assert!(changed.is_empty());
        }

        assert_eq!(fs::read_to_string(&empty).unwrap(), "");
        assert_eq!(fs::read_to_string(&plain).unwrap(), "This is just a random string");
        let after: Vec<_> = files.iter().map(|f| fs::metadata(f).unwrap().modified().unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn batch_stops_at_first_failure_and_names_the_file() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("a.yml");
        let bad = temp.path().join("b.yml");
        let later = temp.path().join("c.yml");
        fs::write(&good, "k: {{ K }}\n").unwrap();
        fs::write(&bad, "k: {{ MISSING }}\n").unwrap();
        fs::write(&later, "k: {{ K }}\n").unwrap();

        let err = substitute_placeholders(&[good.clone(), bad.clone(), later.clone()], &subs(&[("K", "v")]))
            .unwrap_err();
        assert_eq!(err.path, bad);
        assert!(err.to_string().contains("b.yml"));

        // Earlier rewrites are left for the caller to roll back.
        assert_eq!(fs::read_to_string(&good).unwrap(), "k: v\n");
        assert_eq!(fs::read_to_string(&later).unwrap(), "k: {{ K }}\n");
    }

    #[test]
    fn non_utf8_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = substitute_placeholders(&[path.clone()], &subs(&[])).unwrap_err();
        assert!(matches!(err.source, RenderError::NotUtf8));
    }

    #[test]
    fn environment_map_contains_process_vars() {
        let map = environment_substitutions();
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(map.get("PATH"), Some(&path));
        }
    }

    proptest! {
        #[test]
        fn trailing_whitespace_fidelity(
            body in "[a-z:= ]{0,20}[a-z]",
            tail in "[ \t\n]{0,6}",
            eaten in "[\n ]{0,3}",
        ) {
            let original = format!("{body}{tail}");
            let rendered = format!("{body}{eaten}");
            let spliced = splice_trailing_whitespace(&original, &rendered);
            prop_assert!(spliced.ends_with(&tail));
            prop_assert_eq!(trailing_whitespace(&spliced), tail.as_str());
            prop_assert_eq!(spliced, original);
        }

        #[test]
        fn rendered_files_keep_trailing_run(tail in "[ \t\n]{0,6}") {
            let source = format!("key: {{{{ K }}}}{tail}");
            let out = render(&source, &[("K", "value")]).unwrap();
            prop_assert_eq!(out, format!("key: value{tail}"));
        }
    }
}
