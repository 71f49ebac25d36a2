//! Fixed-window rate limiting over a shared in-memory store.
//!
//! # Algorithm
//!
//! Fixed window - not sliding, not token bucket. Each key owns an
//! independent window: the first request in a window records
//! `count = 1` and a reset time one window-length ahead; subsequent
//! requests increment the count until the ceiling, after which they are
//! rejected until the reset time passes. An expired window is replaced
//! wholesale, never merged.
//!
//! A window is live through the exact instant of its reset time: expiry
//! requires `now > reset`, so two requests landing at `now == reset`
//! share the old window.
//!
//! # Known Limitation
//!
//! Fixed windows admit boundary bursts: a client can spend a full ceiling
//! at the end of one window and another at the start of the next, landing
//! up to twice the ceiling in a short interval. This is inherent to the
//! algorithm and kept as-is; the retry contract (`resetTime` reported to
//! clients) depends on window boundaries being fixed.
//!
//! # Concurrency
//!
//! The store is a [`DashMap`]; the read-check-write sequence for a key
//! runs entirely under that key's entry guard, so two concurrent requests
//! for the same key cannot both observe the same count. The background
//! sweep uses `retain`, which locks one shard at a time rather than the
//! whole map. A record deleted by the sweep between a request's lookup
//! and its write is indistinguishable from an expired one - both paths
//! create a fresh window.
//!
//! State is ephemeral and advisory: nothing is persisted, and losing all
//! windows on restart is acceptable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Rate-limit tier a request path falls into.
///
/// Selection is by path only, independent of method. `/api` is a prefix
/// match; `/login` and `/register` match exactly, so `/login/help` falls
/// into the general tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// General page traffic.
    General,
    /// Backend API proxy paths (`/api` prefix).
    Api,
    /// Login attempts.
    Login,
    /// Registration attempts.
    Register,
}

impl RateLimitTier {
    /// Classify a request path. Most specific match wins.
    pub fn for_path(path: &str) -> Self {
        if path.starts_with("/api") {
            Self::Api
        } else if path == "/login" {
            Self::Login
        } else if path == "/register" {
            Self::Register
        } else {
            Self::General
        }
    }

    /// The ceiling this tier gets under the given policy.
    pub fn ceiling(self, limits: &RateLimitConfig) -> u32 {
        match self {
            Self::General => limits.max_general,
            Self::Api => limits.max_api,
            Self::Login => limits.max_login,
            Self::Register => limits.max_register,
        }
    }

    /// Tier name for logging and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Api => "api",
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

/// One accounting window for one key.
#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    /// Requests admitted in this window so far.
    count: u32,
    /// Wall-clock expiry, milliseconds since the Unix epoch.
    reset_at_ms: i64,
}

impl WindowRecord {
    fn fresh(reset_at_ms: i64) -> Self {
        Self {
            count: 0,
            reset_at_ms,
        }
    }
}

/// Outcome of one accounting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The ceiling that applied (for `X-RateLimit-Limit`).
    pub limit: u32,
    /// Requests left in the window (for `X-RateLimit-Remaining`).
    pub remaining: u32,
    /// When the window ends (for `X-RateLimit-Reset` and `retryAfter`).
    pub reset_at: DateTime<Utc>,
}

/// Shared fixed-window rate-limit store, keyed by `{client}:{path}`.
///
/// Explicitly constructed and injected into the gate rather than living in
/// a module-level global, so each test can own an isolated instance.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    window_ms: i64,
    buckets: DashMap<String, WindowRecord>,
}

impl FixedWindowLimiter {
    /// Create a store whose windows last `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            buckets: DashMap::new(),
        }
    }

    /// Account one request against `key` under `limit`.
    ///
    /// Exactly one of three things happens, atomically for the key:
    /// a fresh window starts at count 1 (no record, or the stored window
    /// expired), the existing count increments, or the request is rejected
    /// with the stored reset time.
    pub fn check(&self, key: &str, limit: u32) -> RateLimitDecision {
        let now_ms = Utc::now().timestamp_millis();

        // The entry guard holds the shard lock for the whole
        // read-check-write sequence.
        let mut record = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| WindowRecord::fresh(now_ms + self.window_ms));

        // Strict comparison: at now == reset_at the window is still live.
        if now_ms > record.reset_at_ms {
            *record = WindowRecord::fresh(now_ms + self.window_ms);
        }

        if record.count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at: ms_to_datetime(record.reset_at_ms),
            };
        }

        record.count += 1;
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_at: ms_to_datetime(record.reset_at_ms),
        }
    }

    /// Delete every record whose window has already expired.
    ///
    /// Returns the number of records removed. Safe to run concurrently
    /// with `check`: a record swept between a request's lookup and write
    /// is treated there exactly like an expired one.
    pub fn sweep(&self) -> usize {
        let now_ms = Utc::now().timestamp_millis();
        let before = self.buckets.len();
        self.buckets.retain(|_, record| now_ms <= record.reset_at_ms);
        before.saturating_sub(self.buckets.len())
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}
