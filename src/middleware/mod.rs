//! HTTP middleware for the edge security gate.
//!
//! The gate is the outermost layer and owns the policy decisions:
//!
//! ```text
//! Request → Edge Gate → Request ID → Trace → Handler → Response
//!              ↓
//!   204/403 preflight, 429 rate limit
//! ```
//!
//! Supporting modules:
//!
//! - [`gate`]: the request checkpoint (bypass, origin, preflight,
//!   accounting, header merge)
//! - [`rate_limit`]: the fixed-window store and tier selection
//! - [`headers`]: CORS/CSP/HSTS/security header synthesis
//! - [`ip`]: client-identifier extraction for rate-limit keying
//! - [`request_id`]: `X-Request-Id` generation and propagation

pub mod gate;
pub mod headers;
pub mod ip;
pub mod rate_limit;
pub mod request_id;

pub use gate::EdgeGateLayer;
pub use headers::{HeaderError, HeaderSet};
pub use ip::{UNKNOWN_CLIENT, extract_client_id};
pub use rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitTier};
pub use request_id::RequestIdLayer;
