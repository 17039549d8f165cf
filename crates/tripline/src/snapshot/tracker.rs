//! Local mirror management for the tracked branch.

use std::collections::BTreeSet;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use super::resolver::{self, TagPolicy};
use super::{Snapshot, SnapshotError};
use crate::config::{Config, RunOverrides};
use crate::git::{GitRepository, PullOutcome, RevisionId};

/// Owns the mirror of one `repo_url` + `branch` pair and observes it.
#[derive(Debug, Clone)]
pub struct SnapshotTracker {
    repo_url: String,
    branch: String,
    tag_policy: TagPolicy,
    mirror_root: PathBuf,
    overrides: RunOverrides,
}

impl SnapshotTracker {
    pub fn new(
        repo_url: impl Into<String>,
        branch: impl Into<String>,
        tag_policy: TagPolicy,
        mirror_root: impl Into<PathBuf>,
        overrides: RunOverrides,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: branch.into(),
            tag_policy,
            mirror_root: mirror_root.into(),
            overrides,
        }
    }

    /// Builds a tracker from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(
            config.repo_url.clone(),
            config.branch.clone(),
            TagPolicy::from_config(&config.tag)?,
            config.mirror_dir.clone(),
            config.overrides(),
        ))
    }

    /// Deterministic mirror location, reused across runs.
    pub fn mirror_path(&self) -> PathBuf {
        self.mirror_root.join(mirror_dir_name(&self.repo_url, &self.branch))
    }

    /// Clones or updates the mirror and records what changed.
    ///
    /// This is the only place the repository is touched; the diff is computed
    /// here, eagerly, so the returned snapshot needs no repository access.
    pub fn observe(&self) -> Result<Snapshot, SnapshotError> {
        let local_path = self.mirror_path();

        if !local_path.exists() {
            std::fs::create_dir_all(&self.mirror_root).map_err(|e| SnapshotError::MirrorDir {
                path: self.mirror_root.clone(),
                source: e,
            })?;
            return self.observe_fresh(local_path);
        }

        self.observe_existing(local_path)
    }

    fn observe_fresh(&self, local_path: PathBuf) -> Result<Snapshot, SnapshotError> {
        let repo = GitRepository::clone_branch(&self.repo_url, &self.branch, &local_path)?;
        let new_revision = match self.checkout_tag(&repo).and_then(|()| Ok(repo.head()?)) {
            Ok(revision) => revision,
            Err(e) => {
                // A half-prepared mirror would turn the next run into an update
                // and hide the first observation.
                if let Err(cleanup) = std::fs::remove_dir_all(&local_path) {
                    log::warn!("Failed to remove mirror {:?}: {}", local_path, cleanup);
                }
                return Err(e);
            }
        };

        log::info!(
            "Fresh mirror at {:?}, HEAD {}",
            local_path,
            new_revision.short()
        );

        Ok(Snapshot::new(
            local_path,
            None,
            new_revision,
            BTreeSet::new(),
            self.overrides,
        ))
    }

    fn observe_existing(&self, local_path: PathBuf) -> Result<Snapshot, SnapshotError> {
        let repo = GitRepository::open(&local_path)?;
        let old_revision = repo.head()?;

        repo.checkout_branch(&self.branch)?;
        match repo.pull(&self.branch)? {
            PullOutcome::AlreadyUpToDate => {
                log::debug!("Branch {} already up to date", self.branch)
            }
            PullOutcome::Updated => log::debug!("Branch {} fast-forwarded", self.branch),
        }
        self.checkout_tag(&repo)?;
        let new_revision = repo.head()?;

        let changed_paths = if old_revision != new_revision {
            changed_paths(&repo, &old_revision, &new_revision)?
        } else {
            BTreeSet::new()
        };

        Ok(Snapshot::new(
            local_path,
            Some(old_revision),
            new_revision,
            changed_paths,
            self.overrides,
        ))
    }

    fn checkout_tag(&self, repo: &GitRepository) -> Result<(), SnapshotError> {
        if let Some(revision) = resolver::resolve(&self.tag_policy, repo)? {
            log::info!("Checking out {} for the tag policy", revision.short());
            repo.checkout_revision(&revision)?;
        }
        Ok(())
    }
}

/// Every path touched between two commits; renames contribute both sides.
fn changed_paths(
    repo: &GitRepository,
    old: &RevisionId,
    new: &RevisionId,
) -> Result<BTreeSet<String>, SnapshotError> {
    let mut paths = BTreeSet::new();
    for change in repo.diff_trees(old, new)? {
        paths.extend(change.from);
        paths.extend(change.to);
    }
    Ok(paths)
}

/// Hex-encoded SHA-256 of `repo_url + branch`.
pub fn mirror_dir_name(repo_url: &str, branch: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_url.as_bytes());
    hasher.update(branch.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_mirror_name_is_stable() {
        let a = mirror_dir_name("https://git.example.com/infra.git", "main");
        let b = mirror_dir_name("https://git.example.com/infra.git", "main");
        let c = mirror_dir_name("https://git.example.com/infra.git", "release");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_mirror_name_hashes_concatenation() {
        // hashing the joined bytes, not each field separately
        assert_eq!(mirror_dir_name("ab", "c"), mirror_dir_name("a", "bc"));
    }

    #[test]
    fn test_mirror_path_under_root() {
        let tracker = SnapshotTracker::new(
            "https://git.example.com/infra.git",
            "main",
            TagPolicy::Disabled,
            "/var/lib/tripline",
            RunOverrides::default(),
        );
        let path = tracker.mirror_path();
        assert_eq!(path.parent(), Some(Path::new("/var/lib/tripline")));
    }
}
