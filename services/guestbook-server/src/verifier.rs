// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Human/bot verification backed by reCAPTCHA v3.
//!
//! Verification is mandatory and fail-closed: transport problems surface as
//! [`VerificationError`], and every failed check yields a result with
//! `accepted == false` and a reason code naming the check.

use crate::config::VerificationConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Why a verification did not accept a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationReason {
    TransportError,
    InvalidResponse,
    Timeout,
    RemoteUnsuccessful,
    ActionMismatch,
    ScoreTooLow,
    /// A 0.0 score with no remote error codes. Usually a v2 widget or a
    /// site key mismatch on the frontend.
    ScoreZeroNoErrors,
}

impl VerificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportError => "transport-error",
            Self::InvalidResponse => "invalid-response",
            Self::Timeout => "timeout",
            Self::RemoteUnsuccessful => "remote-unsuccessful",
            Self::ActionMismatch => "action-mismatch",
            Self::ScoreTooLow => "score-too-low",
            Self::ScoreZeroNoErrors => "score-zero-no-errors",
        }
    }
}

impl fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification errors: the remote service could not give an answer.
#[derive(Debug, Error, Clone)]
pub enum VerificationError {
    #[error("verification request failed: {0}")]
    Transport(String),

    #[error("invalid verification response: {0}")]
    InvalidResponse(String),

    #[error("verification timed out")]
    Timeout,
}

impl VerificationError {
    pub fn reason(&self) -> VerificationReason {
        match self {
            Self::Transport(_) => VerificationReason::TransportError,
            Self::InvalidResponse(_) => VerificationReason::InvalidResponse,
            Self::Timeout => VerificationReason::Timeout,
        }
    }
}

/// Outcome of a completed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub accepted: bool,
    /// Remote score, 0.0 (bot) to 1.0 (human)
    pub score: f64,
    /// Our reason code first, then any codes returned by the remote service
    pub reason_codes: Vec<String>,
}

impl VerificationResult {
    pub fn accepted(score: f64) -> Self {
        Self {
            accepted: true,
            score,
            reason_codes: Vec::new(),
        }
    }

    fn rejected(score: f64, reason: VerificationReason, remote_codes: &[String]) -> Self {
        let mut reason_codes = vec![reason.as_str().to_string()];
        reason_codes.extend(remote_codes.iter().cloned());
        Self {
            accepted: false,
            score,
            reason_codes,
        }
    }

    /// The reason code this crate assigned, if the token was rejected.
    pub fn reason(&self) -> Option<&str> {
        self.reason_codes.first().map(String::as_str)
    }
}

/// Verifies a frontend token for a client.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        client_ip: &str,
    ) -> Result<VerificationResult, VerificationError>;

    /// Whether verification actually consults a remote service.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Verifier used when no secret is configured. Accepts every token.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledVerifier;

#[async_trait]
impl HumanVerifier for DisabledVerifier {
    async fn verify(
        &self,
        _token: &str,
        _client_ip: &str,
    ) -> Result<VerificationResult, VerificationError> {
        debug!("Verification disabled, accepting token");
        Ok(VerificationResult::accepted(1.0))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// `siteverify` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub challenge_ts: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// reCAPTCHA v3 client.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret_key: String,
    score_threshold: f64,
    expected_action: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(config: &VerificationConfig) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            score_threshold: config.effective_threshold(),
            expected_action: config.expected_action.clone(),
            verify_url: config.verify_url.clone(),
        })
    }

    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    /// Apply the acceptance checks to a decoded response.
    pub fn evaluate(&self, response: &SiteVerifyResponse) -> VerificationResult {
        evaluate(response, &self.expected_action, self.score_threshold)
    }
}

#[async_trait]
impl HumanVerifier for RecaptchaVerifier {
    async fn verify(
        &self,
        token: &str,
        client_ip: &str,
    ) -> Result<VerificationResult, VerificationError> {
        debug!(ip = %client_ip, token_len = token.len(), "Sending token for verification");

        let resp = self
            .client
            .post(&self.verify_url)
            .form(&[
                ("secret", self.secret_key.as_str()),
                ("response", token),
                ("remoteip", client_ip),
            ])
            .send()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        let body: SiteVerifyResponse = resp
            .json()
            .await
            .map_err(|e| VerificationError::InvalidResponse(e.to_string()))?;

        info!(
            success = body.success,
            score = body.score,
            action = %body.action,
            hostname = %body.hostname,
            error_codes = ?body.error_codes,
            "reCAPTCHA response"
        );

        Ok(self.evaluate(&body))
    }
}

/// Check, in order: the zero-score misconfiguration signal, the remote
/// success flag, the action label and the score threshold.
pub fn evaluate(
    response: &SiteVerifyResponse,
    expected_action: &str,
    threshold: f64,
) -> VerificationResult {
    let codes = &response.error_codes;

    if response.score == 0.0 && codes.is_empty() {
        debug!("Score 0.0 with no error codes, treating as spam");
        return VerificationResult::rejected(0.0, VerificationReason::ScoreZeroNoErrors, codes);
    }

    if !response.success {
        debug!(error_codes = ?codes, "Remote verification unsuccessful");
        return VerificationResult::rejected(
            response.score,
            VerificationReason::RemoteUnsuccessful,
            codes,
        );
    }

    if response.action != expected_action {
        debug!(expected = %expected_action, actual = %response.action, "Action mismatch");
        return VerificationResult::rejected(
            response.score,
            VerificationReason::ActionMismatch,
            codes,
        );
    }

    if response.score < threshold {
        debug!(score = response.score, threshold, "Score too low");
        return VerificationResult::rejected(response.score, VerificationReason::ScoreTooLow, codes);
    }

    debug!(score = response.score, threshold, "Verification passed");
    VerificationResult::accepted(response.score)
}

/// Build the verifier for a configuration. An empty secret yields
/// [`DisabledVerifier`].
pub fn from_config(
    config: &VerificationConfig,
) -> Result<Arc<dyn HumanVerifier>, VerificationError> {
    if config.secret_key.is_empty() {
        info!("reCAPTCHA secret not set, verification disabled");
        return Ok(Arc::new(DisabledVerifier));
    }
    Ok(Arc::new(RecaptchaVerifier::new(config)?))
}
