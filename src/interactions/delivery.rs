//! Delivery of deferred command results.

use super::payload::CallbackTarget;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default Discord message length limit.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 2000;

const TRUNCATION_MARKER: &str = "\n…";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("callback request failed: {0}")]
    Request(String),

    #[error("callback rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sink accepting the final text for an interaction.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, target: &CallbackTarget, content: &str) -> Result<(), DeliveryError>;
}

/// Edits the original deferred response through the webhook API.
pub struct WebhookSink {
    api_base: String,
    max_message_len: usize,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EditMessage<'a> {
    content: &'a str,
}

impl WebhookSink {
    pub fn new(
        api_base: String,
        timeout_seconds: u64,
        max_message_len: usize,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            api_base,
            max_message_len,
            http_client,
        })
    }

    fn message_url(&self, target: &CallbackTarget) -> String {
        format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.api_base.trim_end_matches('/'),
            target.application_id,
            target.token
        )
    }
}

#[async_trait]
impl ResultSink for WebhookSink {
    async fn deliver(&self, target: &CallbackTarget, content: &str) -> Result<(), DeliveryError> {
        let content = truncate_message(content, self.max_message_len);
        let url = self.message_url(target);
        debug!("Delivering {} chars to callback", content.chars().count());

        let response = self
            .http_client
            .patch(&url)
            .json(&EditMessage { content: &content })
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Cut a message to at most `max_len` characters, marking the cut.
pub fn truncate_message(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    let keep = max_len.saturating_sub(marker_len);
    let mut truncated: String = content.chars().take(keep).collect();
    if max_len >= marker_len {
        truncated.push_str(TRUNCATION_MARKER);
    }
    truncated
}
