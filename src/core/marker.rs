//! core::marker
//!
//! Substitution state derived from commit subjects.
//!
//! # Convention
//!
//! No side files are written. Whether the working tree is in its rendered
//! form is recovered purely from history:
//!
//! - a subject starting with [`SUBSTITUTED_MARKER`] marks a substitution commit
//! - a subject starting with [`INTERIM_MARKER`] marks an interim commit that
//!   snapshots edits made on top of a substitution commit
//!
//! Classification is a pure function over the subject text; callers attach
//! the result to the commit they looked up (see [`TaggedCommit`]).

use chrono::{DateTime, TimeZone};

use super::types::Oid;

/// Subject prefix of a substitution commit.
pub const SUBSTITUTED_MARKER: &str = "[SUBST]";

/// Subject prefix of an interim change commit.
pub const INTERIM_MARKER: &str = "[CHNG]";

/// Timestamp format used in substitution commit subjects.
pub const SUBJECT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// State of a single commit, as encoded in its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitState {
    /// Commit holds rendered (live) content.
    Substituted,
    /// Commit snapshots user edits made on top of a substitution commit.
    Interim,
    /// Any other commit; the tree holds templated content.
    Templated,
}

impl CommitState {
    pub fn is_substituted(self) -> bool {
        matches!(self, CommitState::Substituted)
    }

    pub fn label(self) -> &'static str {
        match self {
            CommitState::Substituted => "substituted",
            CommitState::Interim => "interim",
            CommitState::Templated => "templated",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a commit by its subject line.
///
/// Only the first line is considered, and the marker must be a prefix.
///
/// ```
/// use confpatch::core::marker::{classify, CommitState};
///
/// assert_eq!(classify("[SUBST] 2024-05-01 10:00:00"), CommitState::Substituted);
/// assert_eq!(classify("[CHNG]"), CommitState::Interim);
/// assert_eq!(classify("Bump view distance [SUBST]"), CommitState::Templated);
/// ```
pub fn classify(subject: &str) -> CommitState {
    let first_line = subject.lines().next().unwrap_or("");
    if first_line.starts_with(SUBSTITUTED_MARKER) {
        CommitState::Substituted
    } else if first_line.starts_with(INTERIM_MARKER) {
        CommitState::Interim
    } else {
        CommitState::Templated
    }
}

/// Subject for a new substitution commit created at `when`.
pub fn substituted_subject<Tz>(when: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{} {}",
        SUBSTITUTED_MARKER,
        when.format(SUBJECT_TIMESTAMP_FORMAT)
    )
}

/// A commit looked up together with its classified state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedCommit {
    pub oid: Oid,
    pub subject: String,
    pub state: CommitState,
}

impl TaggedCommit {
    pub fn new(oid: Oid, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        let state = classify(&subject);
        Self {
            oid,
            subject,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn substituted_prefix() {
        assert_eq!(classify("[SUBST]"), CommitState::Substituted);
        assert_eq!(classify("[SUBST] 2023-01-01"), CommitState::Substituted);
        assert!(classify("[SUBST]x").is_substituted());
    }

    #[test]
    fn interim_prefix() {
        assert_eq!(classify("[CHNG]"), CommitState::Interim);
        assert!(!classify("[CHNG]").is_substituted());
    }

    #[test]
    fn marker_must_lead_the_subject() {
        assert_eq!(classify(" [SUBST]"), CommitState::Templated);
        assert_eq!(classify("Revert \"[SUBST] x\""), CommitState::Templated);
        assert_eq!(classify("[subst] lowercase"), CommitState::Templated);
    }

    #[test]
    fn only_first_line_counts() {
        assert_eq!(classify("Update config\n\n[SUBST]"), CommitState::Templated);
        assert_eq!(classify("[SUBST] now\n\nbody"), CommitState::Substituted);
    }

    #[test]
    fn empty_subject_is_templated() {
        assert_eq!(classify(""), CommitState::Templated);
    }

    #[test]
    fn new_subject_roundtrips_through_classifier() {
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let subject = substituted_subject(&when);
        assert_eq!(subject, "[SUBST] 2024-03-09 07:05:01");
        assert!(classify(&subject).is_substituted());
    }

    #[test]
    fn tagged_commit_carries_state() {
        let oid = Oid::new("a".repeat(40)).unwrap();
        let tagged = TaggedCommit::new(oid.clone(), "[CHNG]");
        assert_eq!(tagged.oid, oid);
        assert_eq!(tagged.state, CommitState::Interim);
    }
}
