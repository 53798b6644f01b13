// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook submission and entry types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A guestbook form submission as received on the wire.
///
/// Accepted as JSON or URL-encoded form. Missing fields decode as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub message: String,

    /// reCAPTCHA token produced by the frontend
    #[serde(default, rename = "g-recaptcha-response")]
    pub verification_token: String,

    /// Where to send the browser after a successful submission
    #[serde(default)]
    pub redirect: String,

    /// Honeypot. Hidden from humans, filled in by naive bots.
    #[serde(default, rename = "website")]
    pub honeypot: String,
}

impl SubmissionRequest {
    pub fn has_honeypot(&self) -> bool {
        !self.honeypot.is_empty()
    }

    pub fn redirect_target(&self) -> Option<&str> {
        Some(self.redirect.as_str()).filter(|r| !r.is_empty())
    }

    /// Build the entry that gets published, sanitizing user text.
    pub fn to_entry(&self) -> GuestbookEntry {
        GuestbookEntry::new(&self.name, &self.message, Utc::now())
    }
}

/// An accepted guestbook entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookEntry {
    /// `YYYYMMDDHHMMSS` of creation. Not unique within a second.
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub message: String,
    /// Creation time, epoch seconds
    #[serde(rename = "date")]
    pub created_at: i64,
}

impl GuestbookEntry {
    pub fn new(name: &str, message: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: entry_id(at),
            name: escape_html(name),
            message: escape_html(message),
            created_at: at.timestamp(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created_at, 0)
            .single()
            .unwrap_or_default()
    }

    /// Serialize as the YAML document committed to the repository.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn entry_id(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Escape the characters significant in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
