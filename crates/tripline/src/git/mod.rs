//! Revision-control access through the `git` executable.

pub mod error;
pub mod parse;
pub mod repository;
pub mod types;

pub use error::{classify_git_error, GitError};
pub use repository::GitRepository;
pub use types::*;
