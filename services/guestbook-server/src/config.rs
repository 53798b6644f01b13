// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the guestbook server.
//!
//! Everything is sourced from the environment (optionally seeded from
//! `.env.local` / `.env`). Remote collaborators whose credential is empty
//! are disabled rather than failing at startup.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the guestbook service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Human/bot verification (reCAPTCHA)
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Spam reputation service (Akismet)
    #[serde(default)]
    pub spam_check: SpamCheckConfig,

    /// Pull request publisher (GitHub)
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Redirect allow-list
    #[serde(default)]
    pub redirect: RedirectConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Deadline for all remote stages of one submission, in seconds (default: 10)
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Derive client identity from X-Forwarded-For / X-Real-IP (default: false)
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

/// Token bucket parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity: requests admitted per window per client (default: 10)
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    /// Window over which the bucket refills completely, in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between idle-bucket sweeps, in seconds (default: 600)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// reCAPTCHA v3 verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Shared secret. Empty disables verification.
    #[serde(default)]
    pub secret_key: String,

    /// Minimum accepted score (default: 0.5, also used when <= 0)
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    /// Action label the frontend must have declared (default: submit)
    #[serde(default = "default_expected_action")]
    pub expected_action: String,

    /// Verification endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

/// Akismet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamCheckConfig {
    /// API key. Empty disables the reputation check.
    #[serde(default)]
    pub api_key: String,

    /// Site registered with Akismet (default: https://b10a.co)
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Endpoint override. When unset the key-scoped Akismet host is used.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// GitHub publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Access token. Empty leaves the publisher unconfigured.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_repo")]
    pub repo: String,

    /// Base branch pull requests target (default: main)
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory entries are committed under (default: data/guestbook)
    #[serde(default = "default_entries_dir")]
    pub entries_dir: String,

    /// REST API base (default: https://api.github.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins echoed back in Access-Control-Allow-Origin (exact match)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Redirect allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Hosts a successful submission may be redirected to
    #[serde(default = "default_redirect_domains")]
    pub allowed_domains: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Listener for the scrape endpoint, kept off the public port
    /// (default: 127.0.0.1:9090)
    #[serde(default = "default_metrics_bind_addr")]
    pub bind_addr: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_requests_per_window() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    600
}

fn default_score_threshold() -> f64 {
    0.5
}

fn default_expected_action() -> String {
    "submit".to_string()
}

fn default_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

fn default_site_url() -> String {
    "https://b10a.co".to_string()
}

fn default_owner() -> String {
    "bryankaraffa".to_string()
}

fn default_repo() -> String {
    "b10a.co".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_entries_dir() -> String {
    "data/guestbook".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://b10a.co".to_string(),
        "http://localhost:1313".to_string(),
    ]
}

fn default_redirect_domains() -> Vec<String> {
    vec!["b10a.co".to_string()]
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_metrics_bind_addr() -> String {
    "127.0.0.1:9090".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            verification: VerificationConfig::default(),
            spam_check: SpamCheckConfig::default(),
            publisher: PublisherConfig::default(),
            cors: CorsConfig::default(),
            redirect: RedirectConfig::default(),
            metrics: MetricsConfig::default(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            trust_proxy_headers: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            score_threshold: default_score_threshold(),
            expected_action: default_expected_action(),
            verify_url: default_verify_url(),
        }
    }
}

impl Default for SpamCheckConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            site_url: default_site_url(),
            endpoint: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: default_owner(),
            repo: default_repo(),
            branch: default_branch(),
            entries_dir: default_entries_dir(),
            api_url: default_api_url(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_redirect_domains(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
            bind_addr: default_metrics_bind_addr(),
        }
    }
}

impl RateLimitConfig {
    /// Bucket capacity, never zero.
    pub fn capacity(&self) -> f64 {
        self.requests_per_window.max(1) as f64
    }

    /// Get the refill window duration, never zero.
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }

    /// Tokens added back per second.
    pub fn refill_rate(&self) -> f64 {
        self.capacity() / self.window_duration().as_secs_f64()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl VerificationConfig {
    /// Score threshold with the 0.5 fallback applied.
    ///
    /// Anything outside `(0.0, 1.0]`, NaN included, would either accept
    /// every score or reject every score, so it falls back too.
    pub fn effective_threshold(&self) -> f64 {
        if !valid_threshold(self.score_threshold) {
            default_score_threshold()
        } else {
            self.score_threshold
        }
    }
}

fn valid_threshold(threshold: f64) -> bool {
    threshold.is_finite() && threshold > 0.0 && threshold <= 1.0
}

impl Config {
    /// Deadline applied to the remote stages of a single submission.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Load configuration from the process environment.
    ///
    /// `.env.local` is preferred over `.env`; neither is required.
    pub fn from_env() -> Self {
        match dotenvy::from_filename(".env.local") {
            Ok(_) => debug!("Loaded .env.local"),
            Err(e) => {
                debug!(error = %e, "No .env.local file");
                if let Err(e) = dotenvy::dotenv() {
                    debug!(error = %e, "No .env file");
                }
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Config::default();

        if let Some(port) = var("PORT") {
            config.bind_addr = format!("0.0.0.0:{}", port.trim());
        }
        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(key) = var("AKISMET_API_KEY") {
            config.spam_check.api_key = key;
        }
        if let Some(site) = var("AKISMET_SITE_URL") {
            config.spam_check.site_url = site;
        }

        if let Some(secret) = var("RECAPTCHA_SECRET_KEY") {
            config.verification.secret_key = secret;
        }
        if let Some(raw) = var("RECAPTCHA_SCORE_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(threshold) if valid_threshold(threshold) => {
                    config.verification.score_threshold = threshold
                }
                _ => warn!(
                    value = %raw,
                    "Invalid RECAPTCHA_SCORE_THRESHOLD, using default 0.5"
                ),
            }
        }

        if let Some(token) = var("GITHUB_TOKEN") {
            config.publisher.token = token;
        }
        if let Some(owner) = var("GITHUB_OWNER") {
            config.publisher.owner = owner;
        }
        if let Some(repo) = var("GITHUB_REPO") {
            config.publisher.repo = repo;
        }
        if let Some(branch) = var("GITHUB_BRANCH") {
            config.publisher.branch = branch;
        }

        if let Some(origins) = var("ALLOWED_ORIGINS") {
            config.cors.allowed_origins = split_list(&origins);
        }
        if let Some(domains) = var("ALLOWED_REDIRECT_DOMAINS") {
            config.redirect.allowed_domains = split_list(&domains);
        }

        if let Some(n) = parse_var(var("RATE_LIMIT_REQUESTS")) {
            config.rate_limit.requests_per_window = n;
        }
        if let Some(secs) = parse_var(var("RATE_LIMIT_WINDOW")) {
            config.rate_limit.window_secs = secs;
        }
        if let Some(secs) = parse_var(var("RATE_LIMIT_SWEEP_SECS")) {
            config.rate_limit.sweep_interval_secs = secs;
        }
        if let Some(secs) = parse_var(var("UPSTREAM_TIMEOUT_SECS")) {
            config.upstream_timeout_secs = secs;
        }
        if let Some(trust) = parse_var(var("TRUST_PROXY_HEADERS")) {
            config.trust_proxy_headers = trust;
        }
        if let Some(enabled) = parse_var(var("METRICS_ENABLED")) {
            config.metrics.enabled = enabled;
        }
        if let Some(addr) = var("METRICS_BIND_ADDR") {
            config.metrics.bind_addr = addr;
        }

        config
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Split a comma separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a secret for logging without revealing it.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "<masked>".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
