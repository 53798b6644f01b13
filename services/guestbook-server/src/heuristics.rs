// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Local content heuristics.
//!
//! Pure and deterministic: no network access and no error path. The check
//! runs over `name + " " + message` for keywords and over the message alone
//! for links, length and repetition.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Lower-cased substrings that mark a submission as spam.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "[url=http",
    "[link=http",
    "click here",
    "buy now",
    "free",
    "offer",
    "deal",
    "viagra",
    "casino",
    "loan",
    "crypto",
    "bitcoin",
];

/// More links than this is spam.
pub const MAX_LINKS: usize = 2;

/// Longer messages than this (in characters) are spam.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Messages shorter than this skip the repetition test.
pub const MIN_REPETITION_CHARS: usize = 10;

/// Share of a message one character may take before it counts as repetitive.
pub const REPETITION_RATIO: f64 = 0.7;

fn link_re() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| {
        Regex::new(r"(http|ftp|https)://([\w_-]+(?:(?:\.[\w_-]+)+))([\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])?")
            .expect("link pattern is valid")
    })
}

/// Which rule flagged a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamSignal {
    SuspiciousPattern(&'static str),
    TooManyLinks(usize),
    TooLong(usize),
    Repetitive(char),
}

impl fmt::Display for SpamSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuspiciousPattern(p) => write!(f, "suspicious pattern '{p}'"),
            Self::TooManyLinks(n) => write!(f, "{n} links"),
            Self::TooLong(n) => write!(f, "message too long ({n} chars)"),
            Self::Repetitive(c) => write!(f, "repetitive content ({c:?})"),
        }
    }
}

/// Return the first rule the submission trips, if any.
pub fn classify(name: &str, message: &str) -> Option<SpamSignal> {
    let content = format!("{name} {message}").to_lowercase();
    if let Some(pattern) = SUSPICIOUS_PATTERNS.iter().find(|p| content.contains(*p)) {
        return Some(SpamSignal::SuspiciousPattern(pattern));
    }

    let links = count_links(message);
    if links > MAX_LINKS {
        return Some(SpamSignal::TooManyLinks(links));
    }

    let length = message.chars().count();
    if length > MAX_MESSAGE_CHARS {
        return Some(SpamSignal::TooLong(length));
    }

    dominant_char(message).map(SpamSignal::Repetitive)
}

/// True when any rule flags the submission.
pub fn is_likely_spam(name: &str, message: &str) -> bool {
    classify(name, message).is_some()
}

/// Count URL-like substrings.
pub fn count_links(text: &str) -> usize {
    link_re().find_iter(text).count()
}

/// The character making up more than 70% of `text`, for texts of at least
/// ten characters.
fn dominant_char(text: &str) -> Option<char> {
    let total = text.chars().count();
    if total < MIN_REPETITION_CHARS {
        return None;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        *counts.entry(c).or_default() += 1;
    }

    counts
        .into_iter()
        .find(|(_, n)| *n as f64 / total as f64 > REPETITION_RATIO)
        .map(|(c, _)| c)
}
