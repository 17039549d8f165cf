//! Tag policy resolution.

use std::cmp::Reverse;

use regex::Regex;
use semver::Version;

use super::SnapshotError;
use crate::git::{GitError, GitRepository, RevisionId, TagRef};

/// Rule for turning a release marker into the commit to deploy.
#[derive(Debug, Clone)]
pub enum TagPolicy {
    /// Deploy the branch head as pulled.
    Disabled,
    /// Deploy a fixed revision expression (tag, hash, ...).
    Static(String),
    /// Deploy the highest semantic-version tag.
    SemverLatest { include_prerelease: bool },
    /// Deploy the newest tag whose name matches the expression.
    PatternLatest(Regex),
}

/// Resolves `policy` against `repo`. Returns `None` for [`TagPolicy::Disabled`].
pub fn resolve(
    policy: &TagPolicy,
    repo: &GitRepository,
) -> Result<Option<RevisionId>, SnapshotError> {
    let expr = match policy {
        TagPolicy::Disabled => return Ok(None),
        TagPolicy::Static(expr) => expr.clone(),
        TagPolicy::SemverLatest { include_prerelease } => {
            let tags = repo.list_tags()?;
            let (tag, version) = select_semver(&tags, *include_prerelease)
                .ok_or_else(|| SnapshotError::NoMatchingTag {
                    policy: "semver".to_string(),
                })?;
            log::info!("Latest semver tag is {} ({})", tag.name, version);
            tag.name.clone()
        }
        TagPolicy::PatternLatest(regex) => {
            let tags = repo.list_tags()?;
            let tag = select_pattern(&tags, regex).ok_or_else(|| SnapshotError::NoMatchingTag {
                policy: format!("pattern '{}'", regex.as_str()),
            })?;
            log::info!("Newest tag matching '{}' is {}", regex.as_str(), tag.name);
            tag.name.clone()
        }
    };

    match repo.resolve_revision(&expr) {
        Ok(id) => Ok(Some(id)),
        Err(GitError::UnknownRevision(expr)) => Err(SnapshotError::Resolution { expr }),
        Err(e) => Err(e.into()),
    }
}

/// Parses a tag name as a semantic version.
///
/// A leading `v` is dropped, and `1` or `1.2` shorthands are padded with zeros,
/// so `v1.2` compares as `1.2.0`.
pub fn parse_tag_version(name: &str) -> Option<Version> {
    let raw = name
        .strip_prefix('v')
        .or_else(|| name.strip_prefix('V'))
        .unwrap_or(name);

    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    // Shorthand forms carry no pre-release or build suffix.
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let padded = match parts.len() {
        1 => format!("{}.0.0", raw),
        _ => format!("{}.0", raw),
    };
    Version::parse(&padded).ok()
}

/// Picks the highest version by semver precedence, never lexically.
pub fn select_semver(tags: &[TagRef], include_prerelease: bool) -> Option<(&TagRef, Version)> {
    tags.iter()
        .filter_map(|tag| parse_tag_version(&tag.name).map(|v| (tag, v)))
        .filter(|(_, v)| include_prerelease || v.pre.is_empty())
        // equal precedence (e.g. `v1.0.0` and `1.0.0`): the greater name wins
        .max_by(|(a, va), (b, vb)| va.cmp(vb).then_with(|| a.name.cmp(&b.name)))
}

/// Picks the newest tag matching `regex`.
///
/// Tag enumeration order is not meaningful, so candidates are ordered by
/// creator date (newest first) and then by name (greatest first).
pub fn select_pattern<'a>(tags: &'a [TagRef], regex: &Regex) -> Option<&'a TagRef> {
    let mut candidates: Vec<&TagRef> = tags.iter().filter(|t| regex.is_match(&t.name)).collect();
    candidates.sort_by_key(|t| (Reverse(t.created), Reverse(t.name.clone())));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, created: i64) -> TagRef {
        TagRef {
            name: name.to_string(),
            target: "0000000000000000000000000000000000000000".parse().unwrap(),
            created,
        }
    }

    #[test]
    fn test_semver_numeric_not_lexical() {
        let tags = vec![tag("1.2.0", 0), tag("1.10.0", 0), tag("2.0.0-rc1", 0)];
        let (latest, version) = select_semver(&tags, false).unwrap();
        assert_eq!(latest.name, "1.10.0");
        assert_eq!(version, Version::new(1, 10, 0));
    }

    #[test]
    fn test_semver_prerelease_opt_in() {
        let tags = vec![tag("1.2.0", 0), tag("1.10.0", 0), tag("2.0.0-rc1", 0)];
        let (latest, _) = select_semver(&tags, true).unwrap();
        assert_eq!(latest.name, "2.0.0-rc1");
    }

    #[test]
    fn test_semver_skips_non_versions() {
        let tags = vec![
            tag("release-candidate", 0),
            tag("v0.9", 0),
            tag("latest", 0),
        ];
        let (latest, version) = select_semver(&tags, false).unwrap();
        assert_eq!(latest.name, "v0.9");
        assert_eq!(version, Version::new(0, 9, 0));

        let none = vec![tag("nightly", 0), tag("prod", 0)];
        assert!(select_semver(&none, false).is_none());
    }

    #[test]
    fn test_parse_tag_version() {
        assert_eq!(parse_tag_version("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_tag_version("V2"), Some(Version::new(2, 0, 0)));
        assert_eq!(parse_tag_version("3.1"), Some(Version::new(3, 1, 0)));
        assert!(parse_tag_version("1.2.3.4").is_none());
        assert!(parse_tag_version("v1.x").is_none());
        assert!(parse_tag_version("v").is_none());
        assert!(parse_tag_version("1.2-rc1").is_none());
    }

    #[test]
    fn test_pattern_prefers_newest_then_name() {
        let tags = vec![
            tag("prod-2024-01", 100),
            tag("prod-2024-03", 300),
            tag("staging-2024-04", 400),
            tag("prod-2024-02", 300),
        ];
        let regex = Regex::new(r"^prod-").unwrap();

        let picked = select_pattern(&tags, &regex).unwrap();
        assert_eq!(picked.name, "prod-2024-03");

        // independent of enumeration order
        let mut reversed = tags.clone();
        reversed.reverse();
        assert_eq!(
            select_pattern(&reversed, &regex).unwrap().name,
            "prod-2024-03"
        );
    }

    #[test]
    fn test_pattern_no_match() {
        let tags = vec![tag("v1.0.0", 1)];
        let regex = Regex::new("^prod-").unwrap();
        assert!(select_pattern(&tags, &regex).is_none());
    }
}
