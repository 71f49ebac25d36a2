//! Prometheus metrics for gate observability.
//!
//! Metrics are exposed via a dedicated HTTP endpoint on the port set by
//! `METRICS_PORT` (0 disables export; recording becomes a no-op).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `edge_gate_requests_allowed_total` - Requests admitted (label: tier)
//! - `edge_gate_requests_rejected_total` - Requests rejected with 429 (label: tier)
//! - `edge_gate_static_bypass_total` - Requests that skipped the gate
//! - `edge_gate_preflight_total` - OPTIONS preflights (label: allowed)
//! - `edge_gate_sweep_removed_total` - Windows removed by the sweep
//!
//! ## Gauges
//! - `edge_gate_tracked_buckets` - Rate-limit buckets currently tracked
//!
//! # Usage
//!
//! ```rust,ignore
//! use wallspie_edge::metrics::{init_metrics, record_request_allowed};
//!
//! // Initialize metrics (call once at startup)
//! init_metrics(addr)?;
//!
//! // Record in the gate
//! record_request_allowed("api");
//! ```

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_ALLOWED_TOTAL: &str = "edge_gate_requests_allowed_total";
    pub const REQUESTS_REJECTED_TOTAL: &str = "edge_gate_requests_rejected_total";
    pub const STATIC_BYPASS_TOTAL: &str = "edge_gate_static_bypass_total";
    pub const PREFLIGHT_TOTAL: &str = "edge_gate_preflight_total";
    pub const SWEEP_REMOVED_TOTAL: &str = "edge_gate_sweep_removed_total";
    pub const TRACKED_BUCKETS: &str = "edge_gate_tracked_buckets";
}

/// Initialize the Prometheus metrics exporter.
///
/// Sets up metric descriptions and starts the Prometheus HTTP listener
/// on the specified address.
///
/// # Errors
///
/// Returns an error message if the exporter cannot be installed.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_ALLOWED_TOTAL,
        "Total requests admitted by the edge gate"
    );
    describe_counter!(
        names::REQUESTS_REJECTED_TOTAL,
        "Total requests rejected with 429 by the edge gate"
    );
    describe_counter!(
        names::STATIC_BYPASS_TOTAL,
        "Total requests that bypassed the gate as static assets"
    );
    describe_counter!(
        names::PREFLIGHT_TOTAL,
        "Total OPTIONS preflight requests answered by the gate"
    );
    describe_counter!(
        names::SWEEP_REMOVED_TOTAL,
        "Total expired rate-limit windows removed by the background sweep"
    );

    describe_gauge!(
        names::TRACKED_BUCKETS,
        "Rate-limit buckets currently tracked in the window store"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
///
/// Useful where metrics are optional.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

// =============================================================================
// Counter Recording Functions
// =============================================================================

/// Record a request admitted by the gate.
pub fn record_request_allowed(tier: &str) {
    counter!(names::REQUESTS_ALLOWED_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// Record a request rejected with 429.
pub fn record_request_rejected(tier: &str) {
    counter!(names::REQUESTS_REJECTED_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// Record a static-asset bypass.
pub fn record_static_bypass() {
    counter!(names::STATIC_BYPASS_TOTAL).increment(1);
}

/// Record a preflight answer.
pub fn record_preflight(allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    counter!(names::PREFLIGHT_TOTAL, "outcome" => outcome).increment(1);
}

/// Record windows removed by one sweep pass.
pub fn record_sweep_removed(count: usize) {
    counter!(names::SWEEP_REMOVED_TOTAL).increment(count as u64);
}

// =============================================================================
// Gauge Recording Functions
// =============================================================================

/// Update the tracked-buckets gauge.
pub fn set_tracked_buckets(count: usize) {
    gauge!(names::TRACKED_BUCKETS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests verify the functions don't panic without an installed
    // recorder. Full metrics testing requires a Prometheus scraper.

    #[test]
    fn test_record_request_outcomes() {
        record_request_allowed("general");
        record_request_rejected("login");
    }

    #[test]
    fn test_record_static_bypass() {
        record_static_bypass();
    }

    #[test]
    fn test_record_preflight() {
        record_preflight(true);
        record_preflight(false);
    }

    #[test]
    fn test_sweep_metrics() {
        record_sweep_removed(0);
        record_sweep_removed(17);
        set_tracked_buckets(3);
    }
}
