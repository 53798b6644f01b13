// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Spam reputation checks against Akismet.
//!
//! Optional: without an API key the [`DisabledSpamChecker`] answers
//! "not spam" without touching the network. Errors are returned to the
//! caller, which treats them as inconclusive.

use crate::config::SpamCheckConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = "GuestbookServer/1.0";

/// Errors from the reputation service.
#[derive(Debug, Error)]
pub enum SpamCheckError {
    #[error("Akismet request failed: {0}")]
    Transport(String),

    #[error("Akismet API returned status {0}")]
    Status(StatusCode),

    #[error("Akismet check timed out")]
    Timeout,
}

/// What the reputation service is told about a submission.
#[derive(Debug, Clone, Default)]
pub struct CommentSubmission {
    pub user_ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub author: String,
    pub content: String,
}

#[async_trait]
pub trait SpamChecker: Send + Sync {
    /// `Ok(true)` when the service classifies the submission as spam.
    async fn check_spam(&self, comment: &CommentSubmission) -> Result<bool, SpamCheckError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Checker used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSpamChecker;

#[async_trait]
impl SpamChecker for DisabledSpamChecker {
    async fn check_spam(&self, _comment: &CommentSubmission) -> Result<bool, SpamCheckError> {
        debug!("Akismet not configured, skipping spam check");
        Ok(false)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Akismet `comment-check` client.
pub struct AkismetClient {
    client: reqwest::Client,
    site_url: String,
    endpoint: String,
}

impl AkismetClient {
    pub fn new(config: &SpamCheckConfig) -> Result<Self, SpamCheckError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SpamCheckError::Transport(e.to_string()))?;

        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://{}.rest.akismet.com/1.1/comment-check",
                config.api_key
            )
        });

        Ok(Self {
            client,
            site_url: config.site_url.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl SpamChecker for AkismetClient {
    async fn check_spam(&self, comment: &CommentSubmission) -> Result<bool, SpamCheckError> {
        debug!(
            ip = %comment.user_ip,
            author = %comment.author,
            content_len = comment.content.len(),
            "Starting Akismet spam check"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("blog", self.site_url.as_str()),
                ("user_ip", comment.user_ip.as_str()),
                ("user_agent", comment.user_agent.as_str()),
                ("referrer", comment.referrer.as_str()),
                ("comment_type", "guestbook"),
                ("comment_author", comment.author.as_str()),
                ("comment_content", comment.content.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SpamCheckError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(status = %status, "Akismet response status");
        if status != StatusCode::OK {
            return Err(SpamCheckError::Status(status));
        }

        for header in ["X-akismet-debug-help", "X-akismet-pro-tip"] {
            if let Some(value) = resp.headers().get(header).and_then(|v| v.to_str().ok()) {
                debug!(header, value, "Akismet hint");
            }
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SpamCheckError::Transport(e.to_string()))?;

        let is_spam = body.trim() == "true";
        debug!(result = %body.trim(), is_spam, author = %comment.author, "Akismet result");
        Ok(is_spam)
    }
}

/// Build the checker for a configuration. An empty key yields
/// [`DisabledSpamChecker`].
pub fn from_config(config: &SpamCheckConfig) -> Result<Arc<dyn SpamChecker>, SpamCheckError> {
    if config.api_key.is_empty() {
        info!("Akismet API key not set, spam reputation check disabled");
        return Ok(Arc::new(DisabledSpamChecker));
    }
    Ok(Arc::new(AkismetClient::new(config)?))
}
