//! Repository observation and change detection.
//!
//! A [`Snapshot`] is built once per run, before any action is dispatched, and
//! is then shared read-only by every job and chart task.

pub mod resolver;
pub mod tracker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::RunOverrides;
use crate::git::{GitError, RevisionId};

pub use resolver::TagPolicy;
pub use tracker::SnapshotTracker;

/// Changed path reported when a force re-run is requested.
pub const FORCE_RERUN_PATH: &str = "/force-re-run";
/// Changed path reported on the first observation of a repository.
pub const INITIAL_PATH: &str = "/";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Revision '{expr}' does not resolve to a commit")]
    Resolution { expr: String },

    #[error("No tag matches the {policy} tag policy")]
    NoMatchingTag { policy: String },

    #[error("Failed to prepare mirror directory '{path}': {source}")]
    MirrorDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// The `{old head, new head, changed paths}` view of the tracked branch.
#[derive(Debug, Clone)]
pub struct Snapshot {
    local_path: PathBuf,
    old_revision: Option<RevisionId>,
    new_revision: RevisionId,
    changed_paths: BTreeSet<String>,
    overrides: RunOverrides,
}

impl Snapshot {
    /// Builds a snapshot from already computed parts.
    ///
    /// `changed_paths` is dropped unless the head actually moved.
    pub fn new(
        local_path: impl Into<PathBuf>,
        old_revision: Option<RevisionId>,
        new_revision: RevisionId,
        changed_paths: BTreeSet<String>,
        overrides: RunOverrides,
    ) -> Self {
        let moved = old_revision
            .as_ref()
            .is_some_and(|old| *old != new_revision);
        Self {
            local_path: local_path.into(),
            old_revision,
            new_revision,
            changed_paths: if moved { changed_paths } else { BTreeSet::new() },
            overrides,
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn old_revision(&self) -> Option<&RevisionId> {
        self.old_revision.as_ref()
    }

    pub fn new_revision(&self) -> &RevisionId {
        &self.new_revision
    }

    pub fn changed_paths(&self) -> &BTreeSet<String> {
        &self.changed_paths
    }

    pub fn overrides(&self) -> RunOverrides {
        self.overrides
    }

    pub fn is_initial(&self) -> bool {
        self.old_revision.is_none()
    }

    pub fn is_dry_run(&self) -> bool {
        self.overrides.dry_run
    }

    /// Whether this run has any work to do at all.
    pub fn head_moved(&self) -> bool {
        if self.overrides.force_rerun || self.overrides.dry_run {
            return true;
        }
        match &self.old_revision {
            None => true,
            Some(old) => *old != self.new_revision,
        }
    }

    /// Returns the first changed path starting with one of `prefixes`.
    ///
    /// Force re-runs and first observations report a sentinel path for any
    /// prefix list, including an empty one. Matching is a literal string
    /// prefix test, so `charts/api` also matches `charts/api-gateway/...`.
    pub fn changed_under_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> Option<&str> {
        if self.overrides.force_rerun {
            return Some(FORCE_RERUN_PATH);
        }
        if self.is_initial() {
            return Some(INITIAL_PATH);
        }

        self.changed_paths
            .iter()
            .find(|path| prefixes.iter().any(|p| path.starts_with(p.as_ref())))
            .map(String::as_str)
    }
}
