//! Response types for the operational endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy"; the gate has no upstream to lose)
    pub status: String,
    /// Crate version
    pub version: String,
    /// Current server time
    pub timestamp: DateTime<Utc>,
}

/// Gate statistics response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Rate-limit buckets currently tracked (live and not-yet-swept)
    pub tracked_buckets: usize,
    /// Seconds since the process started
    pub uptime_seconds: u64,
    /// Rate-limit window length in seconds
    pub window_secs: u64,
    /// Ceiling for general page traffic
    pub general_limit: u32,
    /// Ceiling for `/api` paths
    pub api_limit: u32,
    /// Ceiling for `/login`
    pub login_limit: u32,
    /// Ceiling for `/register`
    pub register_limit: u32,
}
