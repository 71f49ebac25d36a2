//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │    Edge Gate     │ ← static bypass / 403 preflight / 429 rate limit
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Adds X-Request-Id header
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! The gate is outermost on purpose: rejected requests never generate a
//! request ID or a trace span, and `.layer` (unlike `.route_layer`) also
//! wraps the 404 fallback, so unrouted paths like `/login` are still
//! rate-limited.
//!
//! # Route Groups
//!
//! - `/health`, `/ready` - probes
//! - `/stats` - gate statistics

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{EdgeGateLayer, HeaderError, RequestIdLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Arguments
///
/// * `state` - Application state containing config and the limiter
///
/// # Errors
///
/// Returns `HeaderError` if the configured security policy cannot be
/// encoded into response headers.
pub fn build_router(state: AppState) -> Result<Router, HeaderError> {
    let config = &state.config;

    // =========================================================================
    // Edge Gate Configuration
    // =========================================================================
    let gate = EdgeGateLayer::new(Arc::new(config.security.clone()), Arc::clone(&state.limiter))?;

    info!(
        origins = config.security.allowed_origins.len(),
        production = config.security.production,
        window_secs = config.security.rate_limit.window.as_secs(),
        general = config.security.rate_limit.max_general,
        api = config.security.rate_limit.max_api,
        login = config.security.rate_limit.max_login,
        register = config.security.rate_limit.max_register,
        "Edge gate configured"
    );

    // =========================================================================
    // Build Router (middleware applied bottom to top; gate runs first)
    // =========================================================================
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/stats", get(handlers::stats))
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer::new())
        .layer(gate);

    Ok(router.with_state(state))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_build_router_with_default_config() {
        let state = AppState::new(Config::default());
        assert!(build_router(state.clone()).is_ok());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_router_rejects_bad_policy() {
        let mut config = Config::default();
        config
            .security
            .allowed_font_sources
            .push("https://bad\u{7f}value.example".to_string());

        let state = AppState::new(config);
        assert!(build_router(state.clone()).is_err());
        state.shutdown().await;
    }
}
