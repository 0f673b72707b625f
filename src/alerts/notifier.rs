//! Webhook notification gateway
//!
//! Sends alert and success messages to an incoming-webhook channel.
//! Delivery is best-effort: callers log failures and move on; the markdown
//! artifact on disk is the durable record, not the notification.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::engine::{RETRYABLE_STATUS, RETRY_BACKOFF};

use super::aggregate::AlertPayload;

/// Webhook body limit is ~40k characters; keep a safe margin
pub const MAX_BODY_LEN: usize = 38_000;

const TRUNCATION_MARKER: &str = "\n... [truncated]";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message border color understood by the webhook channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Warning,
    Danger,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Good => "good",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

/// Extra structured field attached to a message
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
}

#[derive(Serialize)]
struct Attachment<'a> {
    color: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "<[Field]>::is_empty")]
    fields: &'a [Field],
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    attachments: [Attachment<'a>; 1],
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no webhook URL configured")]
    NotConfigured,

    #[error("could not build HTTP client: {0}")]
    Client(String),

    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Delivery settings, read from the environment
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub webhook_url: Option<String>,
    /// Send a short pointer-to-artifact message instead of full content
    pub summary_only: bool,
    /// Also notify when a run finds nothing to alert on
    pub send_success: bool,
}

impl NotifySettings {
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var("FLAGMAN_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            summary_only: env_flag("FLAGMAN_SUMMARY_ONLY"),
            send_success: env_flag("FLAGMAN_SEND_SUCCESS"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct Notifier {
    client: reqwest::Client,
    settings: NotifySettings,
    backoff: Vec<Duration>,
}

impl Notifier {
    pub fn new(settings: NotifySettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            settings,
            backoff: RETRY_BACKOFF.to_vec(),
        })
    }

    pub fn from_env() -> Result<Self, NotifyError> {
        Self::new(NotifySettings::from_env())
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Send an alert message for a monitoring suite.
    ///
    /// `artifact_path` is the persisted markdown file the message refers to
    /// in summary-only mode.
    pub async fn send_alert(
        &self,
        alert_type: &str,
        payload: &AlertPayload,
        artifact_path: &Path,
    ) -> Result<(), NotifyError> {
        let title = format!("🚨 {alert_type} Monitoring Alert");
        let text = alert_text(
            self.settings.summary_only,
            payload.count,
            &payload.to_markdown(),
            artifact_path,
        );
        self.send_webhook(Some(&title), &text, Severity::Danger, &[])
            .await
    }

    /// Send an all-good message; a no-op unless the success toggle is set
    pub async fn send_success(&self, alert_type: &str, message: &str) -> Result<(), NotifyError> {
        if !self.settings.send_success {
            return Ok(());
        }
        let title = format!("✅ {alert_type} Monitoring - All Good");
        self.send_webhook(Some(&title), message, Severity::Good, &[])
            .await
    }

    /// Post one message to the webhook, with the bounded retry policy
    pub async fn send_webhook(
        &self,
        title: Option<&str>,
        text: &str,
        severity: Severity,
        fields: &[Field],
    ) -> Result<(), NotifyError> {
        let url = self
            .settings
            .webhook_url
            .as_deref()
            .ok_or(NotifyError::NotConfigured)?;

        let mut text = text.to_string();
        if text.len() > MAX_BODY_LEN {
            // Back off to a char boundary: byte 38k can land mid-character
            let mut cut = MAX_BODY_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str(TRUNCATION_MARKER);
        }
        let payload = WebhookPayload {
            attachments: [Attachment {
                color: severity.as_str(),
                text,
                title,
                fields,
            }],
        };

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                tracing::debug!(status = status.as_u16(), "webhook notification sent");
                return Ok(());
            }
            let code = status.as_u16();
            if !RETRYABLE_STATUS.contains(&code) || attempt >= self.backoff.len() {
                return Err(NotifyError::Status(code));
            }
            tracing::warn!(attempt = attempt + 1, status = code, "webhook delivery retry");
            tokio::time::sleep(self.backoff[attempt]).await;
            attempt += 1;
        }
    }
}

fn alert_text(summary_only: bool, count: usize, markdown: &str, artifact_path: &Path) -> String {
    let plural = if count > 1 { "S" } else { "" };
    if summary_only {
        format!(
            "Hi BI Developer - you have {count} NEW ALERT{plural}!\nDetails were written to: {}",
            artifact_path.display()
        )
    } else {
        format!("Hi BI Developer - you have {count} NEW ALERT{plural}!\n\n{markdown}")
    }
}
