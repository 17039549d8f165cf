//! Slack `chat.postMessage` notifier.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Notification, Notifier, NotifyError};
use crate::config::SlackConfig;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const FAILURE_COLOR: &str = "#FF0000";
const FOOTER: &str = "tripline";

#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub channel: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub color: String,
    pub title: String,
    pub text: String,
    pub fields: Vec<Field>,
    pub footer: String,
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    client: Client,
    endpoint: String,
    channel: String,
    token: SecretString,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self::with_endpoint(config, POST_MESSAGE_URL)
    }

    /// Posts to a different endpoint, e.g. a Slack-compatible relay.
    pub fn with_endpoint(config: &SlackConfig, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            channel: config.channel.clone(),
            token: SecretString::from(config.token.clone()),
        }
    }
}

/// Builds the message body; failures are always shown in red.
pub fn build_payload(channel: &str, notification: &Notification, timestamp: i64) -> Payload {
    let title = format!("{} Update", notification.title);
    let (color, text) = if notification.success {
        (
            notification.color.clone(),
            format!(
                "Successfully updated {}\n{}",
                notification.title, notification.description
            ),
        )
    } else {
        (
            FAILURE_COLOR.to_string(),
            format!(
                "Failed to update {}\n{}",
                notification.title, notification.description
            ),
        )
    };

    let old_head = notification
        .old_revision
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "<none>".to_string());

    Payload {
        channel: channel.to_string(),
        attachments: vec![Attachment {
            color,
            title,
            text,
            fields: vec![
                Field {
                    title: "Old Git HEAD".to_string(),
                    value: old_head,
                    short: false,
                },
                Field {
                    title: "New Git HEAD".to_string(),
                    value: notification.new_revision.to_string(),
                    short: false,
                },
            ],
            footer: FOOTER.to_string(),
            timestamp,
        }],
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload =
            build_payload(&self.channel, notification, chrono::Utc::now().timestamp());
        log::info!("Sending Slack message: {}", payload.attachments[0].title);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse = response.json().await?;
        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
