//! Outbound notifications about finished actions.

pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

use crate::git::RevisionId;

pub use slack::SlackNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// A single "this action finished" message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Hex color used to tint the message.
    pub color: String,
    pub title: String,
    pub success: bool,
    pub description: String,
    pub old_revision: Option<RevisionId>,
    pub new_revision: RevisionId,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Used when no notification transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}
