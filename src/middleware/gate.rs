//! The edge security gate.
//!
//! A tower layer that intercepts every inbound request before any handler
//! runs. Checks happen in a fixed order:
//!
//! 1. **Static-asset bypass**: `/_next`, `/static`, and known file
//!    extensions skip everything - no origin check, no accounting, no
//!    headers added.
//! 2. **Origin check**: exact allow-list lookup. An absent or unrecognized
//!    origin is "not allowed", never default-allow. The request itself
//!    still proceeds (the browser enforces CORS from the response); it
//!    just gets no CORS headers.
//! 3. **Preflight short-circuit**: `OPTIONS` answers immediately - 204
//!    with CORS headers for an allowed origin, 403 otherwise. Preflights
//!    never reach the rate limiter or a downstream handler.
//! 4. **Accounting**: tier selection by path, then one fixed-window
//!    accounting step keyed `{client}:{path}`. Exactly one step per
//!    non-bypassed, non-preflight request.
//! 5. **Header synthesis** on the way out, for admitted and rejected
//!    responses alike: rate-limit headers, fixed security headers, CSP,
//!    HSTS in production, and CORS only when the origin was allowed.
//!
//! Rejected requests are answered here; downstream handlers only ever see
//! admitted requests, unmodified.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::metrics;

use super::headers::{
    HeaderError, HeaderSet, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER,
    RATE_LIMIT_RESET_HEADER,
};
use super::ip::extract_client_id;
use super::rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitTier};

/// Path prefixes that bypass the gate entirely.
const STATIC_PREFIXES: [&str; 2] = ["/_next", "/static"];

/// File extensions that mark a path as a static asset.
const STATIC_EXTENSIONS: [&str; 12] = [
    "ico", "png", "jpg", "jpeg", "svg", "gif", "webp", "woff", "woff2", "ttf", "css", "js",
];

/// Whether a path is a static asset the gate skips.
///
/// Static assets carry no session risk; checking them would waste
/// rate-limit capacity. The extension must terminate the path, and
/// matching is case-sensitive.
fn is_static_asset(path: &str) -> bool {
    if STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| STATIC_EXTENSIONS.contains(&ext))
}

/// Edge gate layer for the Tower middleware stack.
///
/// Owns the security policy, the injected rate-limit store, and the
/// precomputed response headers. Applied outermost so nothing runs for a
/// request the gate rejects.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(FixedWindowLimiter::new(config.rate_limit.window));
/// let gate = EdgeGateLayer::new(Arc::new(config), limiter)?;
/// let app = Router::new().route("/health", get(handler)).layer(gate);
/// ```
#[derive(Clone)]
pub struct EdgeGateLayer {
    config: Arc<SecurityConfig>,
    limiter: Arc<FixedWindowLimiter>,
    headers: HeaderSet,
}

impl EdgeGateLayer {
    /// Create the gate from a security policy and a rate-limit store.
    ///
    /// The store is injected rather than constructed here so tests can
    /// share or inspect it, and so its lifetime is owned by the process
    /// bootstrap alongside the sweep task.
    ///
    /// # Errors
    ///
    /// Returns `HeaderError` if a configured policy value cannot be
    /// encoded into a response header.
    pub fn new(
        config: Arc<SecurityConfig>,
        limiter: Arc<FixedWindowLimiter>,
    ) -> Result<Self, HeaderError> {
        let headers = HeaderSet::build(&config)?;
        Ok(Self {
            config,
            limiter,
            headers,
        })
    }
}

impl<S> Layer<S> for EdgeGateLayer {
    type Service = EdgeGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EdgeGateService {
            inner,
            config: self.config.clone(),
            limiter: self.limiter.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Edge gate service wrapper.
#[derive(Clone)]
pub struct EdgeGateService<S> {
    inner: S,
    config: Arc<SecurityConfig>,
    limiter: Arc<FixedWindowLimiter>,
    headers: HeaderSet,
}

impl<S> Service<Request<Body>> for EdgeGateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let path = req.uri().path();

        if is_static_asset(path) {
            metrics::record_static_bypass();
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        // The origin decision is made once, before the request is moved,
        // and reused for both the preflight answer and the response
        // headers. Non-UTF-8 origin values are "not allowed".
        let allowed_origin = req
            .headers()
            .get(header::ORIGIN)
            .filter(|value| {
                value
                    .to_str()
                    .is_ok_and(|origin| self.config.is_origin_allowed(origin))
            })
            .cloned();

        if req.method() == Method::OPTIONS {
            let response = match &allowed_origin {
                Some(origin) => {
                    metrics::record_preflight(true);
                    debug!(path = %req.uri().path(), "Preflight admitted");
                    let mut response = StatusCode::NO_CONTENT.into_response();
                    self.headers.apply_cors(response.headers_mut(), origin);
                    response
                }
                None => {
                    metrics::record_preflight(false);
                    warn!(path = %req.uri().path(), "Preflight rejected: origin not allowed");
                    (StatusCode::FORBIDDEN, "Origin not allowed").into_response()
                }
            };
            return Box::pin(async move { Ok(response) });
        }

        let tier = RateLimitTier::for_path(path);
        let ceiling = tier.ceiling(&self.config.rate_limit);
        let client_id = extract_client_id(&req);
        let key = format!("{client_id}:{path}");
        let decision = self.limiter.check(&key, ceiling);

        let path = path.to_owned();
        let header_set = self.headers.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = if decision.allowed {
                metrics::record_request_allowed(tier.as_str());
                inner.call(req).await?
            } else {
                metrics::record_request_rejected(tier.as_str());
                warn!(
                    client = %client_id,
                    path = %path,
                    tier = tier.as_str(),
                    reset_at = %decision.reset_at,
                    "Rate limit exceeded"
                );
                too_many_requests(&decision)
            };

            let headers = response.headers_mut();
            if let Some(origin) = &allowed_origin {
                header_set.apply_cors(headers, origin);
            }
            apply_rate_limit_headers(headers, &decision);
            header_set.apply_security(headers);

            Ok(response)
        })
    }
}

/// 429 body shape, mirroring what the frontend's retry logic consumes.
#[derive(Serialize)]
struct RateLimitExceededBody {
    error: &'static str,
    #[serde(rename = "retryAfter")]
    retry_after: String,
}

/// Build the 429 response carrying the window's reset time.
fn too_many_requests(decision: &RateLimitDecision) -> Response<Body> {
    let body = RateLimitExceededBody {
        error: "Too many requests",
        retry_after: iso_timestamp(decision.reset_at),
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

/// Attach `X-RateLimit-Limit`, `X-RateLimit-Remaining`, `X-RateLimit-Reset`.
fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
        HeaderValue::from(decision.remaining),
    );
    if let Ok(reset) = HeaderValue::from_str(&iso_timestamp(decision.reset_at)) {
        headers.insert(HeaderName::from_static(RATE_LIMIT_RESET_HEADER), reset);
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, matching the
/// format the reset timestamps have always been reported in.
fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
