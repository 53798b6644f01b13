// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Structural validation for guestbook submissions.
//!
//! - Body format selection from Content-Type
//! - Required field presence
//! - Redirect target allow-listing (open redirect protection)

use crate::config::RedirectConfig;
use crate::entry::SubmissionRequest;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("Invalid request format")]
    InvalidForm,

    #[error("Name is required")]
    MissingName,

    #[error("reCAPTCHA verification is required")]
    MissingVerificationToken,
}

/// How a submission body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
}

impl BodyFormat {
    /// Pick the decoder for a Content-Type header. Anything that is not JSON
    /// is treated as a form post.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if is_json {
            BodyFormat::Json
        } else {
            BodyFormat::Form
        }
    }

    /// Error reported when a body of this format cannot be decoded.
    pub fn decode_error(self) -> ValidationError {
        match self {
            BodyFormat::Json => ValidationError::InvalidJson,
            BodyFormat::Form => ValidationError::InvalidForm,
        }
    }
}

/// Check the fields every submission must carry.
pub fn validate_required(req: &SubmissionRequest) -> Result<(), ValidationError> {
    if req.name.is_empty() {
        debug!("Missing name");
        return Err(ValidationError::MissingName);
    }
    Ok(())
}

/// Decides whether a redirect target may be followed.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    allowed_domains: Vec<String>,
}

impl RedirectPolicy {
    pub fn new(config: &RedirectConfig) -> Self {
        Self {
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Parse `target` and return it only if its host is allow-listed exactly.
    ///
    /// Only http(s) URLs with a host qualify. Subdomains of an allowed domain
    /// are not implicitly allowed.
    pub fn resolve(&self, target: &str) -> Option<Url> {
        let url = match Url::parse(target) {
            Ok(u) => u,
            Err(_) => {
                debug!(target = %target, "Unparseable redirect target");
                return None;
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            debug!(target = %target, "Redirect target has non-http scheme");
            return None;
        }

        let host = url.host_str()?.to_ascii_lowercase();
        if self.allowed_domains.iter().any(|d| *d == host) {
            Some(url)
        } else {
            debug!(target = %target, host = %host, "Redirect host not allowed");
            None
        }
    }

    pub fn is_allowed(&self, target: &str) -> bool {
        self.resolve(target).is_some()
    }
}
