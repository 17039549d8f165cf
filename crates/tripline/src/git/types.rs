//! Pure data types for git operations.

use std::fmt;
use std::str::FromStr;

use super::error::GitError;

/// A full commit object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl FromStr for RevisionId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // sha1 or sha256 object format
        if (s.len() == 40 || s.len() == 64) && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(RevisionId(s.to_ascii_lowercase()))
        } else {
            Err(GitError::UnexpectedOutput(format!(
                "'{}' is not a commit id",
                s
            )))
        }
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful fast-forward pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Updated,
    AlreadyUpToDate,
}

/// A tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Short tag name, e.g. `v1.2.0`.
    pub name: String,
    /// Commit the tag peels to.
    pub target: RevisionId,
    /// Creator date as a unix timestamp (tagger date for annotated tags,
    /// committer date for lightweight ones).
    pub created: i64,
}

/// One entry of a tree-to-tree diff.
///
/// Added files have only `to`, deleted files only `from`; modifications,
/// renames and copies carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub from: Option<String>,
    pub to: Option<String>,
}
