//! Response header synthesis for the edge gate.
//!
//! Every value here derives from the exact-match allow-lists in
//! [`SecurityConfig`]. Nothing emits a wildcard: CORS echoes the allowed
//! origin verbatim and each CSP directive is joined from configured
//! entries. The expensive pieces (CSP line, HSTS value, fixed security
//! headers) are parsed into `HeaderValue`s once at construction and cloned
//! per response.

use std::fmt;

use axum::http::HeaderMap;
use axum::http::header::{self, HeaderName, HeaderValue};

use crate::config::{HstsConfig, SecurityConfig};

/// Response header reporting the ceiling that applied.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Response header reporting requests left in the window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Response header reporting the window reset time (ISO-8601).
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Fixed security headers attached to every gated response.
const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=(), payment=()",
    ),
];

/// Ad and analytics collectors the gallery's frontend talks to
/// (CSP `connect-src`, alongside the configured API endpoints).
const CONNECT_EXTRA_SOURCES: [&str; 2] = [
    "https://pagead2.googlesyndication.com",
    "https://www.google-analytics.com",
];

/// Error type for header synthesis.
///
/// Raised at gate construction when a configured value cannot be encoded
/// as an HTTP header (e.g. an allow-list entry with control characters).
/// Never raised per-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The named synthesized header is not a valid header value.
    InvalidValue(&'static str),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::InvalidValue(name) => {
                write!(f, "synthesized {name} header is not a valid header value")
            }
        }
    }
}

impl std::error::Error for HeaderError {}

/// Precomputed response headers for one gate instance.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    security: Vec<(HeaderName, HeaderValue)>,
    csp: HeaderValue,
    /// Present only when the policy runs in production mode.
    hsts: Option<HeaderValue>,
}

impl HeaderSet {
    /// Build the header set from a security policy.
    ///
    /// # Errors
    ///
    /// Returns `HeaderError::InvalidValue` if the assembled CSP or HSTS
    /// string cannot be encoded as a header value.
    pub fn build(config: &SecurityConfig) -> Result<Self, HeaderError> {
        let security = SECURITY_HEADERS
            .iter()
            .map(|(name, value)| {
                (
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect();

        let csp = HeaderValue::from_str(&content_security_policy(config))
            .map_err(|_| HeaderError::InvalidValue("content-security-policy"))?;

        let hsts = if config.production {
            Some(
                HeaderValue::from_str(&hsts_value(&config.hsts))
                    .map_err(|_| HeaderError::InvalidValue("strict-transport-security"))?,
            )
        } else {
            None
        };

        Ok(Self {
            security,
            csp,
            hsts,
        })
    }

    /// Attach the fixed security headers, CSP, and (in production) HSTS.
    pub fn apply_security(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.security {
            headers.insert(name.clone(), value.clone());
        }
        headers.insert(header::CONTENT_SECURITY_POLICY, self.csp.clone());
        if let Some(hsts) = &self.hsts {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, hsts.clone());
        }
    }

    /// Attach CORS headers for an origin the policy already allowed.
    ///
    /// The origin is echoed exactly as received; callers must have checked
    /// the allow-list first.
    pub fn apply_cors(&self, headers: &mut HeaderMap, origin: &HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization, X-CSRF-Token"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"), // 24 hours
        );
    }
}

/// Assemble the Content-Security-Policy line from the configured source
/// lists plus the fixed directives.
pub fn content_security_policy(config: &SecurityConfig) -> String {
    let api_domain = config.api_domain();

    let mut img_sources: Vec<&str> = vec!["'self'", "data:", "blob:"];
    img_sources.extend(config.allowed_image_domains.iter().map(String::as_str));
    img_sources.push(api_domain);

    let mut connect_sources: Vec<&str> = vec!["'self'", &config.api_url];
    connect_sources.extend(config.allowed_api_endpoints.iter().map(String::as_str));
    connect_sources.extend(CONNECT_EXTRA_SOURCES);

    let directives = [
        "default-src 'self'".to_string(),
        format!("script-src {}", config.allowed_script_sources.join(" ")),
        format!("style-src {}", config.allowed_style_sources.join(" ")),
        format!("img-src {}", img_sources.join(" ")),
        format!("font-src {}", config.allowed_font_sources.join(" ")),
        format!("connect-src {}", connect_sources.join(" ")),
        format!("frame-src {}", config.allowed_frame_sources.join(" ")),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
        "frame-ancestors 'none'".to_string(),
        "upgrade-insecure-requests".to_string(),
    ];

    directives.join("; ")
}

/// Format the Strict-Transport-Security value from HSTS parameters.
pub fn hsts_value(hsts: &HstsConfig) -> String {
    let mut value = format!("max-age={}", hsts.max_age_secs);
    if hsts.include_subdomains {
        value.push_str("; includeSubDomains");
    }
    if hsts.preload {
        value.push_str("; preload");
    }
    value
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_fixed_directives() {
        let csp = content_security_policy(&SecurityConfig::default());

        assert!(csp.contains("default-src 'self'"));
        assert!(csp.contains("object-src 'none'"));
        assert!(csp.contains("base-uri 'self'"));
        assert!(csp.contains("form-action 'self'"));
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(csp.contains("upgrade-insecure-requests"));
    }

    #[test]
    fn test_csp_joins_configured_sources() {
        let config = SecurityConfig::default();
        let csp = content_security_policy(&config);

        assert!(csp.contains("script-src 'self' 'unsafe-inline' 'unsafe-eval'"));
        assert!(csp.contains("style-src 'self' 'unsafe-inline' https://fonts.googleapis.com"));
        assert!(csp.contains("font-src 'self' https://fonts.gstatic.com"));
    }

    #[test]
    fn test_csp_img_src_includes_api_domain() {
        let config = SecurityConfig {
            api_url: "https://api.wallspie.com/api/v1".to_string(),
            ..SecurityConfig::default()
        };
        let csp = content_security_policy(&config);

        assert!(csp.contains("img-src 'self' data: blob:"));
        assert!(csp.contains("https://res.cloudinary.com https://api.wallspie.com"));
    }

    #[test]
    fn test_csp_connect_src_includes_api_url_and_endpoints() {
        let csp = content_security_policy(&SecurityConfig::default());

        assert!(csp.contains("connect-src 'self' http://localhost:5000/api/v1"));
        assert!(csp.contains("https://www.google-analytics.com"));
    }

    #[test]
    fn test_csp_is_a_single_line() {
        let csp = content_security_policy(&SecurityConfig::default());
        assert!(!csp.contains('\n'));
        assert!(!csp.contains("  "));
    }

    #[test]
    fn test_hsts_value_full() {
        let hsts = HstsConfig::default();
        assert_eq!(
            hsts_value(&hsts),
            "max-age=31536000; includeSubDomains; preload"
        );
    }

    #[test]
    fn test_hsts_value_max_age_only() {
        let hsts = HstsConfig {
            max_age_secs: 600,
            include_subdomains: false,
            preload: false,
        };
        assert_eq!(hsts_value(&hsts), "max-age=600");
    }

    #[test]
    fn test_hsts_value_without_preload() {
        let hsts = HstsConfig {
            max_age_secs: 300,
            include_subdomains: true,
            preload: false,
        };
        assert_eq!(hsts_value(&hsts), "max-age=300; includeSubDomains");
    }

    #[test]
    fn test_header_set_omits_hsts_outside_production() {
        let set = HeaderSet::build(&SecurityConfig::default()).unwrap();

        let mut headers = HeaderMap::new();
        set.apply_security(&mut headers);

        assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
        assert_eq!(
            headers.get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_some());
    }

    #[test]
    fn test_header_set_attaches_hsts_in_production() {
        let config = SecurityConfig {
            production: true,
            ..SecurityConfig::default()
        };
        let set = HeaderSet::build(&config).unwrap();

        let mut headers = HeaderMap::new();
        set.apply_security(&mut headers);

        assert_eq!(
            headers.get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=31536000; includeSubDomains; preload"
        );
    }

    #[test]
    fn test_cors_echoes_origin_exactly() {
        let set = HeaderSet::build(&SecurityConfig::default()).unwrap();
        let origin = HeaderValue::from_static("https://wallspie.com");

        let mut headers = HeaderMap::new();
        set.apply_cors(&mut headers, &origin);

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://wallspie.com"
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
    }

    #[test]
    fn test_build_rejects_unencodable_policy_values() {
        let mut config = SecurityConfig::default();
        config
            .allowed_script_sources
            .push("https://bad\nvalue.example".to_string());

        let result = HeaderSet::build(&config);
        assert_eq!(
            result.unwrap_err(),
            HeaderError::InvalidValue("content-security-policy")
        );
    }
}
