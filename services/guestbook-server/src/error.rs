// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the submission pipeline and their HTTP mapping.

use crate::publisher::PublishError;
use crate::spam_check::SpamCheckError;
use crate::validator::ValidationError;
use crate::verifier::{VerificationError, VerificationResult};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Submissions that are answered with an error rather than a thank-you.
///
/// Spam detections are not errors: they complete as silent rejections.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Rate limit exceeded")]
    RateLimited,

    /// The verification service could not produce an answer.
    #[error("reCAPTCHA verification failed: {0}")]
    VerificationUnavailable(#[from] VerificationError),

    /// The verification service answered and the token did not pass.
    #[error("reCAPTCHA verification failed: {}", .0.reason_codes.join(", "))]
    VerificationRejected(VerificationResult),

    #[error("Failed to submit entry")]
    Publish(#[source] PublishError),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::VerificationUnavailable(_) | Self::VerificationRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the submissions metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::RateLimited => "rate_limited",
            Self::VerificationUnavailable(_) | Self::VerificationRejected(_) => {
                "verification_failed"
            }
            Self::Publish(_) => "publish_failed",
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Invalid(e) => ErrorResponse {
                error: e.to_string(),
                details: None,
            },
            Self::RateLimited => ErrorResponse {
                error: "Rate limit exceeded".to_string(),
                details: None,
            },
            Self::VerificationUnavailable(e) => ErrorResponse {
                error: "reCAPTCHA verification failed".to_string(),
                details: Some(e.reason().to_string()),
            },
            Self::VerificationRejected(result) => ErrorResponse {
                error: "reCAPTCHA verification failed".to_string(),
                details: Some(result.reason_codes.join(", ")),
            },
            // Publish detail stays in the logs.
            Self::Publish(_) => ErrorResponse {
                error: "Failed to submit entry".to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Failures building the remote collaborators at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("verifier: {0}")]
    Verification(#[from] VerificationError),

    #[error("spam checker: {0}")]
    SpamCheck(#[from] SpamCheckError),

    #[error("publisher: {0}")]
    Publish(#[from] PublishError),

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}
