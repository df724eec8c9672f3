//! core::types
//!
//! Strong types shared by the backend adapters and the protocols.
//!
//! # Types
//!
//! - [`Oid`] - Commit identifier (hex SHA)
//! - [`BranchName`] - Validated branch name, used when creating server branches
//!
//! Both types validate at construction, so a malformed value never reaches
//! a backend call.
//!
//! ```
//! use confpatch::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("survival").unwrap();
//! assert_eq!(branch.ref_name(), "refs/heads/survival");
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Follows the subset of `git check-ref-format` rules that matter for
/// branches created by `confpatch new-server`:
/// - non-empty, not exactly `@`
/// - no leading `.` or `-`, no trailing `/` or `.lock`
/// - no `..`, `@{`, `//`, control characters, or any of `` ~^:\?*[``
///
/// ```
/// use confpatch::core::types::BranchName;
///
/// assert!(BranchName::new("servers/creative").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("live.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}' {why}")));

        if name.is_empty() {
            return reject("is empty");
        }
        if name == "@" {
            return reject("is reserved");
        }
        if name.starts_with('-') {
            return reject("starts with '-'");
        }
        if name.ends_with('/') {
            return reject("ends with '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return reject(&format!("contains '{bad}'"));
            }
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_ascii_control() || " ~^:\\?*[".contains(*c))
        {
            return reject(&format!("contains {c:?}"));
        }
        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("has a component starting with '.'");
            }
            if component.ends_with(".lock") {
                return reject("has a component ending with '.lock'");
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full reference name (`refs/heads/<name>`).
    pub fn ref_name(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit identifier (SHA-1 or SHA-256 hex), normalized to lowercase.
///
/// ```
/// use confpatch::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form, as used in operator-facing messages.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn accepts_nested_names() {
            let name = BranchName::new("servers/survival-1.21").unwrap();
            assert_eq!(name.as_str(), "servers/survival-1.21");
            assert_eq!(name.ref_name(), "refs/heads/servers/survival-1.21");
        }

        #[test]
        fn rejects_invalid_names() {
            for bad in [
                "", "@", "-x", "a/", "a..b", "a@{b", "a//b", "a b", "a~b", "a^b", "a:b", "a?b",
                "a*b", "a[b", ".hidden", "a/.hidden", "live.lock", "a\tb",
            ] {
                assert!(BranchName::new(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn error_names_the_branch() {
            let err = BranchName::new("a b").unwrap_err();
            assert!(err.to_string().contains("'a b'"));
        }

        #[test]
        fn serde_roundtrip_validates() {
            let ok: Result<BranchName, _> = serde_json::from_str("\"main\"");
            assert!(ok.is_ok());
            let bad: Result<BranchName, _> = serde_json::from_str("\"a..b\"");
            assert!(bad.is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn accepts_sha1_and_sha256() {
            assert!(Oid::new("a".repeat(40)).is_ok());
            assert!(Oid::new("b".repeat(64)).is_ok());
        }

        #[test]
        fn rejects_bad_length_and_non_hex() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn short_is_clamped() {
            let oid = Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap();
            assert_eq!(oid.short(7), "0123456");
            assert_eq!(oid.short(100).len(), 40);
        }

        #[test]
        fn orders_as_map_key() {
            let low = Oid::new("0".repeat(40)).unwrap();
            let high = Oid::new("F".repeat(40)).unwrap();
            let map: std::collections::BTreeMap<Oid, &str> =
                [(high.clone(), "high"), (low.clone(), "low")].into();
            assert!(low < high);
            assert_eq!(map.keys().collect::<Vec<_>>(), vec![&low, &high]);
        }
    }
}
