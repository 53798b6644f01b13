// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook Server
//!
//! Receives guestbook submissions from a static site, filters spam and
//! opens a pull request per accepted entry.
//!
//! ## Configuration
//!
//! Configuration is loaded from the environment, after `.env.local` and
//! `.env` when present:
//!
//! - `PORT` / `BIND_ADDR`: listen address (default: 0.0.0.0:8080)
//! - `RECAPTCHA_SECRET_KEY`, `RECAPTCHA_SCORE_THRESHOLD`: verification
//! - `AKISMET_API_KEY`, `AKISMET_SITE_URL`: spam reputation
//! - `GITHUB_TOKEN`, `GITHUB_OWNER`, `GITHUB_REPO`, `GITHUB_BRANCH`: publishing
//! - `ALLOWED_ORIGINS`, `ALLOWED_REDIRECT_DOMAINS`: comma separated allow-lists
//! - `RATE_LIMIT_REQUESTS`, `RATE_LIMIT_WINDOW`: per-client limit (default: 10 per 60s)
//! - `METRICS_ENABLED`, `METRICS_BIND_ADDR`: scrape listener (default: 127.0.0.1:9090)
//! - `DEBUG=true`: debug logging unless `RUST_LOG` says otherwise

use guestbook_server::{
    config::{mask_secret, Config},
    handlers::AppState,
    limiter::spawn_sweeper,
    metrics_router, router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let debug = std::env::var("DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        recaptcha_secret = %mask_secret(&config.verification.secret_key),
        score_threshold = config.verification.effective_threshold(),
        akismet_key = %mask_secret(&config.spam_check.api_key),
        github_token = %mask_secret(&config.publisher.token),
        github_repo = %format!("{}/{}", config.publisher.owner, config.publisher.repo),
        github_branch = %config.publisher.branch,
        allowed_origins = ?config.cors.allowed_origins,
        allowed_redirect_domains = ?config.redirect.allowed_domains,
        rate_limit_requests = config.rate_limit.requests_per_window,
        rate_limit_window_secs = config.rate_limit.window_secs,
        metrics_enabled = config.metrics.enabled,
        metrics_bind_addr = %config.metrics.bind_addr,
        "Starting guestbook server"
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let metrics_addr: SocketAddr = config.metrics.bind_addr.parse()?;
    let state = Arc::new(AppState::from_config(config)?);

    let _sweeper = spawn_sweeper(state.limiter.clone());

    if let Some(metrics_app) = metrics_router(state.clone()) {
        let metrics_listener = TcpListener::bind(metrics_addr).await?;
        info!(addr = %metrics_addr, "Metrics listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
                error!(error = %e, "Metrics listener stopped");
            }
        });
    }

    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
