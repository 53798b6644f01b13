// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for guestbook attack simulation.
//!
//! Builds the full router around local collaborators and provides
//! generators, attack profiles and outcome metrics for driving spam and
//! flood traffic through it.

#![allow(dead_code)]

pub mod collaborators;
pub mod generators;
pub mod metrics;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, Response},
    Router,
};
use collaborators::{RecordingPublisher, StaticSpamChecker, StaticVerifier};
use guestbook_server::{
    config::{Config, RedirectConfig},
    router,
    validator::RedirectPolicy,
    AppState, SubmissionPipeline,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

/// Peer address every test request appears to come from.
pub const PEER: ([u8; 4], u16) = ([203, 0, 113, 7], 40000);

/// A router wired to local collaborators, plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub verifier: Arc<StaticVerifier>,
    pub publisher: Arc<RecordingPublisher>,
}

/// Builder for [`TestApp`].
pub struct TestAppBuilder {
    config: Config,
    verifier: Arc<StaticVerifier>,
    spam_checker: Arc<StaticSpamChecker>,
    publisher: Arc<RecordingPublisher>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            verifier: Arc::new(StaticVerifier::disabled()),
            spam_checker: Arc::new(StaticSpamChecker::disabled()),
            publisher: Arc::new(RecordingPublisher::succeeding()),
        }
    }

    pub fn config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn verifier(mut self, verifier: StaticVerifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn spam_checker(mut self, checker: StaticSpamChecker) -> Self {
        self.spam_checker = Arc::new(checker);
        self
    }

    pub fn publisher(mut self, publisher: RecordingPublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    pub fn build(self) -> TestApp {
        let pipeline = SubmissionPipeline::new(
            self.verifier.clone(),
            self.spam_checker,
            self.publisher.clone(),
            RedirectPolicy::new(&self.config.redirect),
            self.config.upstream_timeout(),
        );
        let state = Arc::new(AppState::new(self.config, pipeline).unwrap());
        let router = router(state.clone()).layer(MockConnectInfo(SocketAddr::from(PEER)));

        TestApp {
            router,
            state,
            verifier: self.verifier,
            publisher: self.publisher,
        }
    }
}

/// Default configuration used by the HTTP tests.
pub fn test_config() -> impl FnOnce(&mut Config) {
    |config: &mut Config| {
        config.cors.allowed_origins = vec!["https://b10a.co".to_string()];
        config.redirect = RedirectConfig {
            allowed_domains: vec!["example.com".to_string()],
        };
    }
}

pub fn json_submission(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/guestbook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_submission(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/guestbook")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
