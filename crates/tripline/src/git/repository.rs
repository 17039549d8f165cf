//! Git repository operations.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::error::{classify_git_error, GitError, Result};
use super::parse::{format_git_error, is_already_up_to_date, parse_diff_tree, parse_tag_refs};
use super::types::{ChangeRecord, PullOutcome, RevisionId, TagRef};

const TAG_FORMAT: &str =
    "--format=%(refname:short)%00%(objectname)%00%(*objectname)%00%(creatordate:unix)";

/// Handle on a local clone, driven through the `git` executable.
///
/// Every call blocks on a child process. Callers finish all repository work
/// before fanning out concurrent tasks.
#[derive(Debug, Clone)]
pub struct GitRepository {
    repo_path: PathBuf,
}

impl GitRepository {
    /// Opens an existing clone.
    pub fn open(repo_path: impl Into<PathBuf>) -> Result<Self> {
        let repo_path = repo_path.into();
        if !repo_path.join(".git").exists() {
            return Err(GitError::NotARepository(repo_path));
        }
        Ok(Self { repo_path })
    }

    /// Clones only `branch` of `url` into `repo_path`.
    pub fn clone_branch(url: &str, branch: &str, repo_path: impl Into<PathBuf>) -> Result<Self> {
        let repo_path = repo_path.into();
        log::info!("Cloning {} ({}) into {:?}", url, branch, repo_path);

        let output = git_command(None)
            .args([
                "clone",
                "--quiet",
                "--single-branch",
                "--branch",
                branch,
                "--",
                url,
            ])
            .arg(&repo_path)
            .output()
            .map_err(GitError::Spawn)?;

        if !output.status.success() {
            return Err(classify_git_error(&format_git_error(&output)));
        }

        Ok(Self { repo_path })
    }

    /// Returns the commit HEAD points at.
    pub fn head(&self) -> Result<RevisionId> {
        let output = self.run_git_checked(&["rev-parse", "--verify", "HEAD"])?;
        String::from_utf8_lossy(&output.stdout).parse()
    }

    /// Resolves a revision expression (tag, branch, abbreviated hash) to a commit.
    pub fn resolve_revision(&self, expr: &str) -> Result<RevisionId> {
        let spec = format!("{}^{{commit}}", expr);
        let output = self.run_git(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(GitError::UnknownRevision(expr.to_string()));
        }
        String::from_utf8_lossy(&output.stdout).parse()
    }

    /// Detaches HEAD at `revision`.
    pub fn checkout_revision(&self, revision: &RevisionId) -> Result<()> {
        self.run_git_checked(&["checkout", "--quiet", "--detach", revision.as_str()])?;
        Ok(())
    }

    /// Checks out `branch`, creating it from `origin/<branch>` when missing locally.
    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        let output = self.run_git(&["checkout", "--quiet", branch])?;
        if output.status.success() {
            return Ok(());
        }

        let remote_ref = format!("origin/{}", branch);
        self.run_git_checked(&["checkout", "--quiet", "-B", branch, &remote_ref])?;
        Ok(())
    }

    /// Fast-forwards the checked out branch from `origin`, fetching tags too.
    pub fn pull(&self, branch: &str) -> Result<PullOutcome> {
        let output = self.run_git_checked(&["pull", "--ff-only", "--tags", "origin", branch])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if is_already_up_to_date(&stdout) {
            Ok(PullOutcome::AlreadyUpToDate)
        } else {
            Ok(PullOutcome::Updated)
        }
    }

    /// Lists all tags with the commit each one peels to.
    pub fn list_tags(&self) -> Result<Vec<TagRef>> {
        let output = self.run_git_checked(&["for-each-ref", TAG_FORMAT, "refs/tags"])?;
        Ok(parse_tag_refs(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Structural diff between the trees of two commits, with rename detection.
    pub fn diff_trees(&self, from: &RevisionId, to: &RevisionId) -> Result<Vec<ChangeRecord>> {
        let output = self.run_git_checked(&[
            "diff-tree",
            "-r",
            "-z",
            "-M",
            "--no-commit-id",
            "--name-status",
            from.as_str(),
            to.as_str(),
        ])?;
        Ok(parse_diff_tree(&output.stdout))
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        git_command(Some(&self.repo_path))
            .args(args)
            .output()
            .map_err(GitError::Spawn)
    }

    fn run_git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run_git(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }
}

fn git_command(dir: Option<&Path>) -> Command {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    // Never block on a credential prompt; keep messages untranslated for parsing.
    cmd.env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}
