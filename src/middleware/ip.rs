//! Client identifier extraction for rate-limit keying.
//!
//! # Header Priority
//!
//! 1. `X-Forwarded-For` - first entry of the comma-separated list
//! 2. `X-Real-Ip`
//! 3. Falls back to [`UNKNOWN_CLIENT`]
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These headers are client-controlled unless the gate sits behind a
//! reverse proxy that overwrites them. Deploy behind a trusted proxy and
//! block direct internet access, or per-client rate limiting can be
//! bypassed by rotating spoofed addresses.
//!
//! # The "unknown" Bucket
//!
//! Requests carrying no identifiable address all share the `"unknown"`
//! key, so unidentified traffic is rate-limited collectively. That
//! coarseness is deliberate: a malformed or absent header must never fail
//! the request, only degrade the precision of its bucket. Monitor for high
//! "unknown" traffic in production logs.

use std::borrow::Cow;

use axum::http::Request;

/// Fallback identifier when no client address can be determined.
///
/// All such requests share one rate-limit bucket per path.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client identifier from request headers.
///
/// Returns the first `X-Forwarded-For` entry (the originating client, with
/// later entries being intermediate proxies), then `X-Real-Ip`, then
/// [`UNKNOWN_CLIENT`]. Values that are empty after trimming, or headers
/// that are not valid UTF-8, fall through to the next source.
///
/// # Returns
///
/// `Cow<'static, str>` - borrowed for the "unknown" fallback (no
/// allocation), owned for actual addresses. Use `.into_owned()` when the
/// key must outlive the request reference.
#[inline]
pub fn extract_client_id<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Cow::Owned(first.to_string());
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return Cow::Owned(value.to_string());
        }
    }

    Cow::Borrowed(UNKNOWN_CLIENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_from_forwarded_for_takes_first() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.50, 70.41.3.18, 150.172.238.178")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "203.0.113.50");
    }

    #[test]
    fn test_extract_from_forwarded_for_single() {
        let req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "1.2.3.4");
    }

    #[test]
    fn test_extract_from_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "192.168.1.1");
    }

    #[test]
    fn test_forwarded_for_takes_priority_over_real_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "10.0.0.1");
    }

    #[test]
    fn test_no_headers_falls_back_to_unknown() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let id = extract_client_id(&req);
        assert_eq!(id, UNKNOWN_CLIENT);
        // The fallback must not allocate
        assert!(matches!(id, Cow::Borrowed(_)));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let req = Request::builder()
            .header("x-forwarded-for", "  1.2.3.4  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "1.2.3.4");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through_to_real_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "192.168.1.1");
    }

    #[test]
    fn test_whitespace_only_headers_degrade_to_unknown() {
        let req = Request::builder()
            .header("x-forwarded-for", "   ")
            .header("x-real-ip", " ")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_ipv6_addresses_pass_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "2001:db8::1");
    }

    #[test]
    fn test_garbage_value_is_used_verbatim() {
        // Identifiers are opaque keys; an unparseable address still buckets
        // consistently rather than failing the request.
        let req = Request::builder()
            .header("x-forwarded-for", "not-an-ip")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_id(&req), "not-an-ip");
    }
}
