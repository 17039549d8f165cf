//! Git fixtures backed by temporary directories.
//!
//! `Upstream` is a regular repository on the `main` branch; its path is used
//! directly as the repository URL, so no network access is needed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use tripline::config::{Config, TagConfig};

/// Runs git in `dir` with a fixed identity and returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
        ])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// The tracked repository plus a scratch directory for mirrors.
pub struct Upstream {
    repo: TempDir,
    mirrors: TempDir,
}

impl Upstream {
    /// Creates an empty repository with `main` checked out.
    pub fn new() -> Self {
        let repo = TempDir::new().expect("Failed to create temp directory");
        git(repo.path(), &["init", "--quiet", "--initial-branch=main"]);
        Self {
            repo,
            mirrors: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    pub fn url(&self) -> String {
        self.repo.path().display().to_string()
    }

    pub fn mirror_root(&self) -> PathBuf {
        self.mirrors.path().to_path_buf()
    }

    /// Writes files and commits them; returns the new commit id.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (path, content) in files {
            let full = self.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create directories");
            }
            std::fs::write(full, content).expect("Failed to write file");
        }
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "--quiet", "-m", message]);
        self.head()
    }

    /// Renames a tracked file and commits; returns the new commit id.
    pub fn rename(&self, from: &str, to: &str) -> String {
        if let Some(parent) = self.path().join(to).parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        git(self.path(), &["mv", from, to]);
        let message = format!("rename {from}");
        git(self.path(), &["commit", "--quiet", "-m", &message]);
        self.head()
    }

    pub fn tag(&self, name: &str) {
        git(self.path(), &["tag", name]);
    }

    pub fn head(&self) -> String {
        git(self.path(), &["rev-parse", "HEAD"])
    }

    /// A daemon configuration tracking `main` of this repository.
    pub fn config(&self) -> Config {
        Config {
            repo_url: self.url(),
            branch: "main".to_string(),
            mirror_dir: self.mirrors.path().display().to_string(),
            tag: TagConfig::default(),
            ..Default::default()
        }
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self::new()
    }
}
