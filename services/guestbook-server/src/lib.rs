// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook Server
//!
//! Accepts guestbook submissions over HTTP and publishes accepted entries
//! as pull requests against a content repository. Each submission passes
//! an admission pipeline:
//!
//! - Per-client token bucket rate limiting
//! - Required field validation
//! - Honeypot trap
//! - reCAPTCHA v3 verification (fail-closed)
//! - Akismet reputation check (fail-open)
//! - Content heuristics
//! - Publish, then an allow-listed redirect or a JSON thank-you
//!
//! Spam is rejected silently: the submitter sees the same 200 response as
//! a genuine acceptance. Outcome counters live on a separate metrics
//! listener for the same reason.

pub mod config;
pub mod entry;
pub mod error;
pub mod handlers;
pub mod heuristics;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod spam_check;
pub mod validator;
pub mod verifier;

pub use config::Config;
pub use entry::{GuestbookEntry, SubmissionRequest};
pub use error::{SetupError, SubmissionError};
pub use handlers::AppState;
pub use limiter::RateLimiter;
pub use pipeline::{ClientContext, Outcome, RejectReason, SubmissionPipeline};

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Build the public service router.
///
/// Layer order, outermost first: tracing, CORS (answers preflights),
/// rate limiting, routes. Metrics are not served here; see
/// [`metrics_router`].
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/guestbook", post(handlers::submit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::rate_limit,
        ))
        .layer(cors_layer(&state.config.cors.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the scrape router for the metrics listener.
///
/// The outcome counters split silent rejects by filter, so they are only
/// served on `metrics.bind_addr`, never next to `/guestbook`. Returns
/// `None` when metrics are disabled or the path is unusable.
pub fn metrics_router(state: Arc<AppState>) -> Option<Router> {
    let metrics = &state.config.metrics;
    if !metrics.enabled {
        return None;
    }
    if !metrics.path.starts_with('/') {
        warn!(path = %metrics.path, "Metrics path must start with '/', endpoint disabled");
        return None;
    }

    let path = metrics.path.clone();
    Some(
        Router::new()
            .route(&path, get(handlers::metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(state),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
