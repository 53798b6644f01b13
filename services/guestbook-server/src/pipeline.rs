// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The submission admission pipeline.
//!
//! Stages, in order, each able to end the submission:
//!
//! 1. Required fields (400)
//! 2. Honeypot (silent reject, before any network call)
//! 3. Verification token, mandatory and fail-closed (400)
//! 4. Spam reputation, optional and fail-open (silent reject)
//! 5. Content heuristics (silent reject)
//! 6. Publish (500 on failure)
//! 7. Redirect decision
//!
//! Silent rejections are reported as [`Outcome::SilentReject`] so the HTTP
//! layer can answer them exactly like a success. All remote stages share one
//! deadline per submission.

use crate::config::Config;
use crate::entry::{GuestbookEntry, SubmissionRequest};
use crate::error::{SetupError, SubmissionError};
use crate::heuristics::{self, SpamSignal};
use crate::publisher::{self, EntryPublisher, PublishError, PublishedEntry};
use crate::spam_check::{self, CommentSubmission, SpamCheckError, SpamChecker};
use crate::validator::{self, RedirectPolicy, ValidationError};
use crate::verifier::{self, HumanVerifier, VerificationError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Request metadata that is not part of the submitted form.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip: String,
    pub user_agent: String,
    pub referrer: String,
}

/// Why a submission was dropped without telling the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Honeypot,
    Reputation,
    Heuristics(SpamSignal),
}

impl RejectReason {
    /// Label used for the submissions metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Honeypot => "silent_reject_honeypot",
            Self::Reputation => "silent_reject_reputation",
            Self::Heuristics(_) => "silent_reject_heuristics",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Honeypot => f.write_str("honeypot field filled"),
            Self::Reputation => f.write_str("flagged by reputation service"),
            Self::Heuristics(signal) => write!(f, "content heuristics: {signal}"),
        }
    }
}

/// Result of a submission that did not error.
#[derive(Debug, Clone)]
pub enum Outcome {
    Accepted {
        entry: GuestbookEntry,
        published: PublishedEntry,
        /// Allow-listed redirect target, if one was supplied
        redirect: Option<Url>,
    },
    SilentReject(RejectReason),
}

impl Outcome {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::SilentReject(reason) => reason.outcome(),
        }
    }
}

pub struct SubmissionPipeline {
    verifier: Arc<dyn HumanVerifier>,
    spam_checker: Arc<dyn SpamChecker>,
    publisher: Arc<dyn EntryPublisher>,
    redirects: RedirectPolicy,
    upstream_timeout: Duration,
}

impl SubmissionPipeline {
    pub fn new(
        verifier: Arc<dyn HumanVerifier>,
        spam_checker: Arc<dyn SpamChecker>,
        publisher: Arc<dyn EntryPublisher>,
        redirects: RedirectPolicy,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            spam_checker,
            publisher,
            redirects,
            upstream_timeout,
        }
    }

    /// Wire up the real collaborators described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        Ok(Self::new(
            verifier::from_config(&config.verification)?,
            spam_check::from_config(&config.spam_check)?,
            publisher::from_config(&config.publisher)?,
            RedirectPolicy::new(&config.redirect),
            config.upstream_timeout(),
        ))
    }

    /// Run one submission through every stage.
    pub async fn submit(
        &self,
        req: SubmissionRequest,
        client: &ClientContext,
    ) -> Result<Outcome, SubmissionError> {
        debug!(
            ip = %client.ip,
            name = %req.name,
            message_len = req.message.len(),
            token_present = !req.verification_token.is_empty(),
            "Processing submission"
        );

        validator::validate_required(&req)?;

        if req.has_honeypot() {
            return Ok(self.silent_reject(RejectReason::Honeypot, client));
        }

        let deadline = Instant::now() + self.upstream_timeout;

        self.verify(&req, client, deadline).await?;

        if self.flagged_by_reputation(&req, client, deadline).await {
            return Ok(self.silent_reject(RejectReason::Reputation, client));
        }

        if let Some(signal) = heuristics::classify(&req.name, &req.message) {
            return Ok(self.silent_reject(RejectReason::Heuristics(signal), client));
        }

        let entry = req.to_entry();
        let published = match timeout_at(deadline, self.publisher.publish(&entry)).await {
            Ok(Ok(published)) => published,
            Ok(Err(e)) => return Err(self.publish_failed(e, client)),
            Err(_) => return Err(self.publish_failed(PublishError::Timeout, client)),
        };
        info!(ip = %client.ip, name = %entry.name, branch = %published.branch, "Guestbook entry published");

        let redirect = req.redirect_target().and_then(|target| {
            let resolved = self.redirects.resolve(target);
            if resolved.is_none() {
                warn!(target = %target, "Blocked redirect to non allow-listed host");
            }
            resolved
        });

        Ok(Outcome::Accepted {
            entry,
            published,
            redirect,
        })
    }

    /// Mandatory verification. Any failure, including a timeout, rejects.
    async fn verify(
        &self,
        req: &SubmissionRequest,
        client: &ClientContext,
        deadline: Instant,
    ) -> Result<(), SubmissionError> {
        if !self.verifier.is_enabled() {
            debug!("Verification disabled, skipping");
            return Ok(());
        }

        if req.verification_token.is_empty() {
            debug!(ip = %client.ip, "No verification token supplied");
            return Err(ValidationError::MissingVerificationToken.into());
        }

        let result = timeout_at(
            deadline,
            self.verifier.verify(&req.verification_token, &client.ip),
        )
        .await
        .unwrap_or(Err(VerificationError::Timeout))
        .map_err(|e| {
            info!(ip = %client.ip, reason = %e.reason(), error = %e, "Verification unavailable");
            SubmissionError::from(e)
        })?;

        if !result.accepted {
            info!(
                ip = %client.ip,
                score = result.score,
                reasons = ?result.reason_codes,
                "Verification rejected"
            );
            return Err(SubmissionError::VerificationRejected(result));
        }

        debug!(ip = %client.ip, score = result.score, "Verification passed");
        Ok(())
    }

    /// Optional reputation check. Errors and timeouts let the submission through.
    async fn flagged_by_reputation(
        &self,
        req: &SubmissionRequest,
        client: &ClientContext,
        deadline: Instant,
    ) -> bool {
        let comment = CommentSubmission {
            user_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            referrer: client.referrer.clone(),
            author: req.name.clone(),
            content: req.message.clone(),
        };

        match timeout_at(deadline, self.spam_checker.check_spam(&comment))
            .await
            .unwrap_or(Err(SpamCheckError::Timeout))
        {
            Ok(is_spam) => is_spam,
            Err(e) => {
                warn!(ip = %client.ip, error = %e, "Spam reputation check failed, continuing");
                false
            }
        }
    }

    fn silent_reject(&self, reason: RejectReason, client: &ClientContext) -> Outcome {
        info!(ip = %client.ip, reason = %reason, "Silently rejecting submission");
        Outcome::SilentReject(reason)
    }

    fn publish_failed(&self, e: PublishError, client: &ClientContext) -> SubmissionError {
        error!(ip = %client.ip, error = %e, "Failed to publish guestbook entry");
        SubmissionError::Publish(e)
    }
}
