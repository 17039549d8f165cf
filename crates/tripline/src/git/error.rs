//! Git-specific error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the `git` executable.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Git operation failed: {0}")]
    Operation(String),

    #[error("Git network error: {0}")]
    Network(String),

    #[error("Git authentication failed: {0}")]
    AuthFailed(String),

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Unknown revision '{0}'")]
    UnknownRevision(String),

    #[error("Unexpected git output: {0}")]
    UnexpectedOutput(String),
}

/// Classifies a git stderr string into a more specific error variant.
pub fn classify_git_error(stderr: &str) -> GitError {
    let lower = stderr.to_lowercase();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return GitError::Network(stderr.trim().to_string());
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("could not read username")
    {
        return GitError::AuthFailed(stderr.trim().to_string());
    }

    GitError::Operation(stderr.trim().to_string())
}

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_git_error() {
        assert!(matches!(
            classify_git_error("fatal: unable to access 'https://x/': Could not resolve host: x"),
            GitError::Network(_)
        ));
        assert!(matches!(
            classify_git_error("fatal: Authentication failed for 'https://x/'"),
            GitError::AuthFailed(_)
        ));
        assert!(matches!(
            classify_git_error("fatal: Not possible to fast-forward, aborting."),
            GitError::Operation(_)
        ));
    }
}
