//! # Wallspie Edge Gate
//!
//! The edge security gate fronting the Wallspie wallpaper gallery:
//! exact-match CORS, tiered fixed-window rate limiting, and security
//! header synthesis, with page and API handlers treated as external
//! collaborators behind it.
//!
//! - **No wildcards**: every origin, endpoint, and CSP source is an
//!   exact string; an unrecognized origin never receives CORS headers
//! - **Fixed-window rate limiting**: four path tiers over a shared
//!   in-memory store, swept in the background
//! - **Deterministic headers**: rate-limit, security, CSP, and (in
//!   production) HSTS headers on every gated response
//! - **Observability**: request IDs, structured logging, Prometheus
//!   metrics, health endpoints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Edge Gate (bypass → origin → preflight → tier → account)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, ready, stats) / downstream application   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FixedWindowLimiter (shared store + background sweep)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wallspie_edge::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("invalid configuration");
//!     let state = AppState::new(config);
//!     let app = build_router(state).expect("invalid security policy");
//!
//!     // Serve the router, then `state.shutdown().await` on exit...
//! }
//! ```
//!
//! ## Security Configuration
//!
//! Add a deployment origin to the allow-list:
//! ```bash
//! SITE_URL=https://wallspie.com cargo run
//! ```
//!
//! Point the CSP at a deployed backend:
//! ```bash
//! API_URL=https://api.wallspie.com/api/v1 APP_ENV=production cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, HstsConfig, RateLimitConfig, SecurityConfig};
pub use error::{AppError, AppResult};
pub use middleware::{EdgeGateLayer, FixedWindowLimiter};
pub use routes::build_router;
pub use state::AppState;
