// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the guestbook service.

use crate::config::Config;
use crate::entry::SubmissionRequest;
use crate::error::{SetupError, SubmissionError};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::pipeline::{ClientContext, Outcome, SubmissionPipeline};
use crate::validator::BodyFormat;
use axum::{
    extract::{ConnectInfo, FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The only success body. Silent rejects must not be told apart from
/// genuine acceptance.
const RECEIVED_MESSAGE: &str =
    "Thank you for your submission! It will be reviewed before being published.";

/// Shared application state.
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub pipeline: SubmissionPipeline,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, pipeline: SubmissionPipeline) -> Result<Self, SetupError> {
        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            pipeline,
            metrics: Metrics::new()?,
            config,
        })
    }

    /// State with the remote collaborators described by `config`.
    pub fn from_config(config: Config) -> Result<Self, SetupError> {
        let pipeline = SubmissionPipeline::from_config(&config)?;
        Self::new(config, pipeline)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Success body, shared by genuine acceptance and silent rejection.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Per-client admission gate in front of every route.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&state.config, connect.as_ref(), request.headers());

    if !state.limiter.allow(&ip).await {
        info!(ip = %ip, path = %request.uri().path(), "Request rate limited");
        state.metrics.record_rate_limited();
        return SubmissionError::RateLimited.into_response();
    }

    next.run(request).await
}

/// Accept a guestbook submission as JSON or a form post.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    let headers = request.headers();
    let client = ClientContext {
        ip: client_ip(&state.config, connect.as_ref(), headers),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
        referrer: header_str(headers, header::REFERER.as_str()),
    };
    let format = BodyFormat::from_content_type(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );

    let decoded = match format {
        BodyFormat::Json => Json::<SubmissionRequest>::from_request(request, &())
            .await
            .map(|Json(req)| req)
            .map_err(|e| e.body_text()),
        BodyFormat::Form => Form::<SubmissionRequest>::from_request(request, &())
            .await
            .map(|Form(req)| req)
            .map_err(|e| e.body_text()),
    };

    let req = match decoded {
        Ok(req) => req,
        Err(detail) => {
            debug!(ip = %client.ip, ?format, error = %detail, "Failed to decode submission");
            return reject(&state, format.decode_error().into());
        }
    };

    match state.pipeline.submit(req, &client).await {
        Ok(outcome) => {
            state.metrics.record_submission(outcome.outcome());
            match outcome {
                Outcome::Accepted {
                    redirect: Some(url),
                    ..
                } => {
                    debug!(ip = %client.ip, location = %url, "Redirecting after submission");
                    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
                }
                Outcome::Accepted { redirect: None, .. } | Outcome::SilentReject(_) => {
                    Json(MessageResponse {
                        message: RECEIVED_MESSAGE,
                    })
                    .into_response()
                }
            }
        }
        Err(e) => reject(&state, e),
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn reject(state: &AppState, err: SubmissionError) -> Response {
    state.metrics.record_submission(err.outcome());
    err.into_response()
}

/// Client identity used for rate limiting and the remote checks.
///
/// Forwarding headers are only honoured when the service is configured to
/// sit behind a trusted proxy.
pub fn client_ip(
    config: &Config,
    connect: Option<&ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> String {
    if config.trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded.or(real_ip) {
            return ip.to_string();
        }
    }

    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
