// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process stand-ins for reCAPTCHA, Akismet and GitHub.

use async_trait::async_trait;
use guestbook_server::{
    entry::GuestbookEntry,
    publisher::{EntryPublisher, PublishError, PublishedEntry},
    spam_check::{CommentSubmission, SpamCheckError, SpamChecker},
    verifier::{HumanVerifier, VerificationError, VerificationResult},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Verifier with a fixed answer.
pub struct StaticVerifier {
    enabled: bool,
    result: Result<VerificationResult, VerificationError>,
    calls: AtomicUsize,
}

impl StaticVerifier {
    pub fn disabled() -> Self {
        Self::new(false, Ok(VerificationResult::accepted(1.0)))
    }

    pub fn accepting() -> Self {
        Self::new(true, Ok(VerificationResult::accepted(0.9)))
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::new(
            true,
            Ok(VerificationResult {
                accepted: false,
                score: 0.1,
                reason_codes: vec![reason.to_string()],
            }),
        )
    }

    pub fn unreachable() -> Self {
        Self::new(
            true,
            Err(VerificationError::Transport("connection refused".to_string())),
        )
    }

    fn new(enabled: bool, result: Result<VerificationResult, VerificationError>) -> Self {
        Self {
            enabled,
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HumanVerifier for StaticVerifier {
    async fn verify(
        &self,
        _token: &str,
        _client_ip: &str,
    ) -> Result<VerificationResult, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Reputation checker that flags content containing a marker string.
pub struct StaticSpamChecker {
    enabled: bool,
    marker: Option<String>,
    unreachable: bool,
}

impl StaticSpamChecker {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            marker: None,
            unreachable: false,
        }
    }

    pub fn flagging(marker: &str) -> Self {
        Self {
            enabled: true,
            marker: Some(marker.to_string()),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            enabled: true,
            marker: None,
            unreachable: true,
        }
    }
}

#[async_trait]
impl SpamChecker for StaticSpamChecker {
    async fn check_spam(&self, comment: &CommentSubmission) -> Result<bool, SpamCheckError> {
        if self.unreachable {
            return Err(SpamCheckError::Transport("dns error".to_string()));
        }
        Ok(self
            .marker
            .as_deref()
            .is_some_and(|m| comment.content.contains(m)))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Publisher that remembers every entry it was asked to publish.
pub struct RecordingPublisher {
    fail: bool,
    entries: Mutex<Vec<GuestbookEntry>>,
}

impl RecordingPublisher {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn entries(&self) -> Vec<GuestbookEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntryPublisher for RecordingPublisher {
    async fn publish(&self, entry: &GuestbookEntry) -> Result<PublishedEntry, PublishError> {
        self.entries.lock().unwrap().push(entry.clone());
        if self.fail {
            return Err(PublishError::CreatePullRequest(
                "GitHub returned 422 Unprocessable Entity".to_string(),
            ));
        }
        Ok(PublishedEntry {
            branch: format!("guestbook-entry-{}", entry.created_at),
            path: format!("data/guestbook/entry{}.yml", entry.created_at),
            pull_request_url: Some("https://github.com/owner/repo/pull/1".to_string()),
        })
    }
}
