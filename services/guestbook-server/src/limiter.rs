// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket rate limiter keyed by client identity.
//!
//! Every client key lazily receives a bucket holding `requests_per_window`
//! tokens that refills continuously over `window_secs`. A periodic sweep
//! drops buckets that have fully refilled; buckets with any consumed
//! headroom are kept, so a client sending steady low-rate traffic is never
//! reclaimed.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Token bucket for a single client.
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Available tokens
    tokens: f64,
    /// Maximum tokens (bucket capacity)
    capacity: f64,
    /// Token refill rate per second
    refill_rate: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: now,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume a token. Returns true if successful.
    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whether the client still has consumed headroom outstanding.
    fn is_active(&self) -> bool {
        self.tokens < self.capacity
    }
}

/// Per-client admission control.
///
/// The bucket map sits behind one mutex; `allow` holds it only for the
/// lookup-or-create and consume, and `sweep` holds it while swapping in the
/// pruned map.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Attempt to admit one request from `client_key`.
    ///
    /// Never waits for a token: an exhausted bucket answers `false`
    /// immediately.
    pub async fn allow(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(client_key.to_string()).or_insert_with(|| {
            TokenBucket::new(self.config.capacity(), self.config.refill_rate(), now)
        });

        let allowed = bucket.try_consume(now);
        if !allowed {
            debug!(client = %client_key, "Rate limit exceeded");
        }
        allowed
    }

    /// Drop buckets judged idle. Returns the number evicted.
    ///
    /// A replacement map is built from the retained buckets and swapped in
    /// while the lock is held.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        let before = buckets.len();
        let retained: HashMap<String, TokenBucket> = buckets
            .iter()
            .filter_map(|(key, bucket)| {
                let mut bucket = bucket.clone();
                bucket.refill(now);
                bucket.is_active().then(|| (key.clone(), bucket))
            })
            .collect();
        *buckets = retained;

        let evicted = before - buckets.len();
        debug!(evicted, retained = buckets.len(), "Rate limiter sweep complete");
        evicted
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Run [`RateLimiter::sweep`] on the configured interval until the task is aborted.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    let period = limiter.config().sweep_interval();
    info!(interval_secs = period.as_secs(), "Starting rate limiter sweeper");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.sweep().await;
        }
    })
}
