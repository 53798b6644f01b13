// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Ordinary messages a visitor might leave.
pub fn generate_clean_messages(count: usize) -> Vec<String> {
    let openers = [
        "Great site",
        "Thanks for the write-up",
        "Found you via the newsletter",
        "Greetings from Lisbon",
    ];
    (0..count)
        .map(|i| format!("{}! Visit number {}.", openers[i % openers.len()], i))
        .collect()
}

/// Messages each tripping one content heuristic.
pub fn generate_spam_messages() -> Vec<String> {
    vec![
        // Keywords
        "Cheap VIAGRA shipped overnight".to_string(),
        "Best online casino bonus".to_string(),
        "Click here to win".to_string(),
        "Limited time offer, buy now".to_string(),
        "Free money, claim yours today".to_string(),
        // Links
        "see https://a.example https://b.example https://c.example".to_string(),
        "http://1.example http://2.example http://3.example http://4.example".to_string(),
        // Length
        "y".repeat(400) + &"z".repeat(601),
        // Repetition
        "aaaaaaaaaa".to_string(),
        "!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!".to_string(),
    ]
}

/// Messages sitting just inside each heuristic boundary.
pub fn generate_boundary_messages() -> Vec<String> {
    vec![
        "two links: https://a.example and https://b.example/page".to_string(),
        "m".repeat(500) + &"n".repeat(500),
        "aaaaaaaaa".to_string(),
        "aaaaaaabbb".to_string(),
    ]
}

/// Values a naive bot writes into every field, including the honeypot.
pub fn generate_honeypot_values() -> Vec<&'static str> {
    vec![
        "http://spam.example",
        "https://seo-backlinks.example/buy",
        "a",
        " ",
    ]
}

/// Redirect targets that must never produce a redirect.
pub fn generate_hostile_redirects() -> Vec<&'static str> {
    vec![
        "https://evil.example",
        "https://example.com.evil.example/",
        "https://evil.example/?next=https://example.com",
        "https://sub.example.com/",
        "javascript:alert(1)",
        "data:text/html,<script>alert(1)</script>",
        "//evil.example/",
        "/relative/path",
        "ftp://example.com/",
        "not a url",
    ]
}

/// Bodies that cannot be decoded as a submission.
pub fn generate_malformed_json() -> Vec<&'static str> {
    vec![
        "",
        "{",
        "{\"name\":",
        "[1, 2, 3]",
        "\"just a string\"",
        "{\"name\": 42}",
        "<xml/>",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_clean_messages_are_unique() {
        let messages = generate_clean_messages(20);
        let unique: std::collections::HashSet<_> = messages.iter().collect();
        assert_eq!(unique.len(), 20);
    }
}
