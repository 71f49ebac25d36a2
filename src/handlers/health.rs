//! Health, readiness, and statistics endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /ready` - Kubernetes-compatible readiness probe
//! - `GET /stats` - Gate statistics (limiter occupancy, policy snapshot)
//!
//! All three sit behind the gate and count against the general tier.
//! `/stats` in particular reveals limiter occupancy, so it deliberately
//! gets no bypass.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::{HealthResponse, StatsResponse};
use crate::state::AppState;

/// Health check endpoint.
///
/// The gate is pure in-memory computation with no upstream dependency,
/// so health is unconditional once the process serves traffic.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2026-01-15T10:30:00Z"
/// }
/// ```
#[instrument]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// Ready as soon as the listener is accepting; there is no external
/// service to wait for.
#[instrument]
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}

/// Statistics endpoint.
///
/// Reports limiter occupancy, uptime, and a snapshot of the rate-limit
/// policy. Occupancy counts every tracked bucket, including expired ones
/// the sweep has not yet removed.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let limits = &state.config.security.rate_limit;

    Ok(Json(StatsResponse {
        tracked_buckets: state.limiter.len(),
        uptime_seconds: state.uptime_seconds(),
        window_secs: limits.window.as_secs(),
        general_limit: limits.max_general,
        api_limit: limits.max_api,
        login_limit: limits.max_login,
        register_limit: limits.max_register,
    }))
}
