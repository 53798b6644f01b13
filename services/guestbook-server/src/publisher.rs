// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Publishing accepted entries as GitHub pull requests.
//!
//! One entry becomes one branch, one YAML file and one pull request against
//! the configured base branch. Any failed step aborts the whole publish.

use crate::config::PublisherConfig;
use crate::entry::GuestbookEntry;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Publishing failures. Details are for logs, not for submitters.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("GitHub client not configured")]
    NotConfigured,

    #[error("failed to build GitHub client: {0}")]
    Client(String),

    #[error("failed to serialize entry: {0}")]
    Serialize(String),

    #[error("failed to get {branch} branch ref: {detail}")]
    BaseRef { branch: String, detail: String },

    #[error("failed to create branch: {0}")]
    CreateBranch(String),

    #[error("failed to create file: {0}")]
    CreateFile(String),

    #[error("failed to create pull request: {0}")]
    CreatePullRequest(String),

    #[error("publish timed out")]
    Timeout,
}

/// A pull request opened for an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEntry {
    pub branch: String,
    pub path: String,
    pub pull_request_url: Option<String>,
}

#[async_trait]
pub trait EntryPublisher: Send + Sync {
    async fn publish(&self, entry: &GuestbookEntry) -> Result<PublishedEntry, PublishError>;
}

/// Publisher used when no token is configured. Every publish fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredPublisher;

#[async_trait]
impl EntryPublisher for UnconfiguredPublisher {
    async fn publish(&self, _entry: &GuestbookEntry) -> Result<PublishedEntry, PublishError> {
        Err(PublishError::NotConfigured)
    }
}

/// Minimal GitHub REST client covering the four calls a publish needs.
pub struct GithubPublisher {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: String,
    entries_dir: String,
}

impl GithubPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("GuestbookServer/1.0"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|e| PublishError::Client(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| PublishError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            entries_dir: config.entries_dir.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, path)
    }

    async fn base_sha(&self) -> Result<String, PublishError> {
        let map_err = |detail: String| PublishError::BaseRef {
            branch: self.branch.clone(),
            detail,
        };

        let resp = self
            .client
            .get(self.repo_url(&format!("git/ref/heads/{}", self.branch)))
            .send()
            .await
            .map_err(|e| map_err(e.to_string()))?;
        let resp = ensure_success(resp).await.map_err(map_err)?;

        let reference: ApiRef = resp.json().await.map_err(|e| map_err(e.to_string()))?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), PublishError> {
        let resp = self
            .client
            .post(self.repo_url("git/refs"))
            .json(&NewRef {
                r#ref: format!("refs/heads/{name}"),
                sha: sha.to_string(),
            })
            .send()
            .await
            .map_err(|e| PublishError::CreateBranch(e.to_string()))?;
        ensure_success(resp)
            .await
            .map_err(PublishError::CreateBranch)?;
        Ok(())
    }

    async fn create_file(
        &self,
        path: &str,
        branch: &str,
        message: String,
        content: &[u8],
    ) -> Result<(), PublishError> {
        let resp = self
            .client
            .put(self.repo_url(&format!("contents/{path}")))
            .json(&NewFile {
                message,
                content: STANDARD.encode(content),
                branch: branch.to_string(),
            })
            .send()
            .await
            .map_err(|e| PublishError::CreateFile(e.to_string()))?;
        ensure_success(resp).await.map_err(PublishError::CreateFile)?;
        Ok(())
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<Option<String>, PublishError> {
        let resp = self
            .client
            .post(self.repo_url("pulls"))
            .json(pr)
            .send()
            .await
            .map_err(|e| PublishError::CreatePullRequest(e.to_string()))?;
        let resp = ensure_success(resp)
            .await
            .map_err(PublishError::CreatePullRequest)?;

        let created: ApiPullRequest = resp
            .json()
            .await
            .map_err(|e| PublishError::CreatePullRequest(e.to_string()))?;
        Ok(created.html_url)
    }
}

#[async_trait]
impl EntryPublisher for GithubPublisher {
    async fn publish(&self, entry: &GuestbookEntry) -> Result<PublishedEntry, PublishError> {
        let stamp = entry.created_at;
        let path = format!("{}/entry{}.yml", self.entries_dir, stamp);
        let branch = format!("guestbook-entry-{stamp}");

        let yaml = entry
            .to_yaml()
            .map_err(|e| PublishError::Serialize(e.to_string()))?;

        let sha = self.base_sha().await?;
        debug!(base = %self.branch, sha = %sha, "Resolved base branch");

        self.create_branch(&branch, &sha).await?;
        debug!(branch = %branch, "Created branch");

        self.create_file(
            &path,
            &branch,
            format!("New Guestbook Post from {}", entry.name),
            yaml.as_bytes(),
        )
        .await?;
        debug!(path = %path, "Committed entry");

        let pr = NewPullRequest {
            title: pull_request_title(entry),
            head: branch.clone(),
            base: self.branch.clone(),
            body: pull_request_body(entry),
        };
        let pull_request_url = self.create_pull_request(&pr).await?;
        info!(branch = %branch, url = ?pull_request_url, "Opened guestbook pull request");

        Ok(PublishedEntry {
            branch,
            path,
            pull_request_url,
        })
    }
}

/// Turn a non-2xx response into its status and body text.
async fn ensure_success(resp: Response) -> Result<Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("GitHub returned {status}: {}", body.trim()))
}

pub fn pull_request_title(entry: &GuestbookEntry) -> String {
    format!("New Guestbook Entry from {}", entry.name)
}

pub fn pull_request_body(entry: &GuestbookEntry) -> String {
    format!(
        "New guestbook entry submission:\n\n**Name:** {}\n**Message:** {}\n\nSubmitted on: {}",
        entry.name,
        entry.message,
        entry.created_at().format("%B %-d, %Y %H:%M:%S")
    )
}

/// Build the publisher for a configuration. An empty token yields
/// [`UnconfiguredPublisher`].
pub fn from_config(config: &PublisherConfig) -> Result<Arc<dyn EntryPublisher>, PublishError> {
    if config.token.is_empty() {
        info!("GitHub token not set, submissions cannot be published");
        return Ok(Arc::new(UnconfiguredPublisher));
    }
    Ok(Arc::new(GithubPublisher::new(config)?))
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    object: ApiObject,
}

#[derive(Debug, Deserialize)]
struct ApiObject {
    sha: String,
}

#[derive(Debug, Serialize)]
struct NewRef {
    r#ref: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct NewFile {
    message: String,
    content: String,
    branch: String,
}

#[derive(Debug, Serialize)]
struct NewPullRequest {
    title: String,
    head: String,
    base: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    html_url: Option<String>,
}
