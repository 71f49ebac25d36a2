//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! Server settings are loaded from environment variables with sensible
//! defaults for development. The security policy (allow-lists, rate-limit
//! tiers, header values) is compiled in; only `SITE_URL` and `API_URL`
//! feed into it from the environment, and both are folded into the
//! allow-lists at load time. The policy is immutable after startup.
//!
//! # No Wildcards
//!
//! Every allow-list entry is an exact scheme+host string or a CSP keyword
//! token. There is no pattern matching, and `validate()` rejects any entry
//! containing `*`.
//!
//! # Rate-Limit Tiers
//!
//! - General traffic: 100 requests per window
//! - `/api` paths: 50 requests per window
//! - `/login`: 5 requests per window
//! - `/register`: 3 requests per window
//!
//! The window is 60 seconds. Expired windows are garbage-collected by a
//! background sweep (default every 5 minutes, see `SWEEP_INTERVAL_SECS`).

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

// =============================================================================
// Compiled-in security policy defaults
// =============================================================================

/// Origins allowed to make credentialed cross-origin requests.
const DEFAULT_ALLOWED_ORIGINS: [&str; 6] = [
    "http://localhost:3000",
    "http://localhost:5000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5000",
    "https://wallspie.com",
    "https://www.wallspie.com",
];

/// Backend API endpoints the browser may connect to (CSP `connect-src`).
const DEFAULT_API_ENDPOINTS: [&str; 2] = ["http://localhost:5000", "http://127.0.0.1:5000"];

/// Image CDN domains (CSP `img-src`).
const DEFAULT_IMAGE_DOMAINS: [&str; 1] = ["https://res.cloudinary.com"];

/// Script sources (CSP `script-src`). Inline and eval are required by the
/// gallery's ad and analytics tags.
const DEFAULT_SCRIPT_SOURCES: [&str; 6] = [
    "'self'",
    "'unsafe-inline'",
    "'unsafe-eval'",
    "https://pagead2.googlesyndication.com",
    "https://www.googletagmanager.com",
    "https://www.google-analytics.com",
];

/// Style sources (CSP `style-src`).
const DEFAULT_STYLE_SOURCES: [&str; 3] = [
    "'self'",
    "'unsafe-inline'",
    "https://fonts.googleapis.com",
];

/// Font sources (CSP `font-src`).
const DEFAULT_FONT_SOURCES: [&str; 2] = ["'self'", "https://fonts.gstatic.com"];

/// Frame sources (CSP `frame-src`).
const DEFAULT_FRAME_SOURCES: [&str; 4] = [
    "'self'",
    "https://www.google.com",
    "https://www.youtube.com",
    "https://pagead2.googlesyndication.com",
];

/// Default backend API base URL. The versioned path suffix is stripped to
/// derive the bare API domain for `img-src`.
const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";

/// Path suffix separating the API domain from the versioned base URL.
const API_VERSION_SUFFIX: &str = "/api/v1";

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Gate will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Security Policy
    // =========================================================================
    /// Immutable security policy: allow-lists, rate-limit tiers, HSTS.
    pub security: SecurityConfig,

    // =========================================================================
    // Background Sweep Configuration
    // =========================================================================
    /// Interval between sweeps of expired rate-limit windows (default: 300s)
    pub sweep_interval: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

/// Immutable security policy for the edge gate.
///
/// Constructed once at startup and shared behind an `Arc`. Tests build
/// their own instances with different allow-lists and ceilings instead of
/// mutating a global.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Exact match only, never `*`.
    pub allowed_origins: Vec<String>,

    /// Allowed backend API endpoints for CSP `connect-src`.
    pub allowed_api_endpoints: Vec<String>,

    /// Allowed image CDN domains for CSP `img-src`.
    pub allowed_image_domains: Vec<String>,

    /// Allowed CSP `script-src` entries (keyword tokens or exact origins).
    pub allowed_script_sources: Vec<String>,

    /// Allowed CSP `style-src` entries.
    pub allowed_style_sources: Vec<String>,

    /// Allowed CSP `font-src` entries.
    pub allowed_font_sources: Vec<String>,

    /// Allowed CSP `frame-src` entries.
    pub allowed_frame_sources: Vec<String>,

    /// Backend API base URL, including the versioned path.
    pub api_url: String,

    /// Rate-limit window and per-tier ceilings.
    pub rate_limit: RateLimitConfig,

    /// HSTS parameters; the header is only attached when `production`.
    pub hsts: HstsConfig,

    /// Whether the gate runs in production mode (enables HSTS).
    pub production: bool,
}

/// Fixed-window rate-limit policy: one window duration, four ceilings.
///
/// A ceiling is the number of requests *allowed* within one window, not
/// the count at which limiting starts: with a ceiling of 5, requests 1-5
/// pass and request 6 is rejected.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Window duration shared by all tiers.
    pub window: Duration,

    /// Ceiling for general page traffic.
    pub max_general: u32,

    /// Ceiling for `/api` paths.
    pub max_api: u32,

    /// Ceiling for `/login`. Intentionally low.
    pub max_login: u32,

    /// Ceiling for `/register`. Intentionally low.
    pub max_register: u32,
}

/// HTTP Strict Transport Security parameters.
#[derive(Debug, Clone, Copy)]
pub struct HstsConfig {
    /// `max-age` directive in seconds (default: one year).
    pub max_age_secs: u64,

    /// Whether to emit `includeSubDomains`.
    pub include_subdomains: bool,

    /// Whether to emit `preload`.
    pub preload: bool,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `SITE_URL` is appended to the allowed origins and `API_URL` replaces
    /// the default backend URL (its bare domain joins the API endpoint
    /// allow-list). Everything else in the security policy is compiled in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is invalid (non-numeric
    /// `PORT`, wildcard allow-list entries, zero ceilings).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut security = SecurityConfig {
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            ..SecurityConfig::default()
        };

        if let Ok(site_url) = env::var("SITE_URL") {
            let site_url = site_url.trim().trim_end_matches('/').to_string();
            if !site_url.is_empty() && !security.allowed_origins.contains(&site_url) {
                security.allowed_origins.push(site_url);
            }
        }

        if let Ok(api_url) = env::var("API_URL") {
            let api_url = api_url.trim().trim_end_matches('/').to_string();
            if !api_url.is_empty() {
                let api_domain = api_url
                    .strip_suffix(API_VERSION_SUFFIX)
                    .unwrap_or(&api_url)
                    .to_string();
                if !security.allowed_api_endpoints.contains(&api_domain) {
                    security.allowed_api_endpoints.push(api_domain);
                }
                security.api_url = api_url;
            }
        }

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Security policy
            security,

            // Background sweep
            sweep_interval: Duration::from_secs(Self::parse_env("SWEEP_INTERVAL_SECS", 300)?),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        self.security.validate()
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

impl SecurityConfig {
    /// Check whether an origin is in the allow-list. Exact string equality;
    /// absence and near-misses are both "not allowed".
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }

    /// The bare API domain, with the versioned path suffix stripped.
    pub fn api_domain(&self) -> &str {
        self.api_url
            .strip_suffix(API_VERSION_SUFFIX)
            .unwrap_or(&self.api_url)
    }

    /// Validate the policy: non-zero window and ceilings, no wildcard or
    /// empty allow-list entries, sane HSTS max-age.
    pub fn validate(&self) -> AppResult<()> {
        if self.rate_limit.window.is_zero() {
            return Err(AppError::ConfigError(
                "rate-limit window must be greater than 0".to_string(),
            ));
        }

        for (name, ceiling) in [
            ("general", self.rate_limit.max_general),
            ("api", self.rate_limit.max_api),
            ("login", self.rate_limit.max_login),
            ("register", self.rate_limit.max_register),
        ] {
            if ceiling == 0 {
                return Err(AppError::ConfigError(format!(
                    "rate-limit ceiling for {name} tier must be greater than 0"
                )));
            }
        }

        let lists = [
            ("allowed_origins", &self.allowed_origins),
            ("allowed_api_endpoints", &self.allowed_api_endpoints),
            ("allowed_image_domains", &self.allowed_image_domains),
            ("allowed_script_sources", &self.allowed_script_sources),
            ("allowed_style_sources", &self.allowed_style_sources),
            ("allowed_font_sources", &self.allowed_font_sources),
            ("allowed_frame_sources", &self.allowed_frame_sources),
        ];
        for (name, list) in lists {
            for entry in list {
                if entry.is_empty() {
                    return Err(AppError::ConfigError(format!(
                        "{name} contains an empty entry"
                    )));
                }
                if entry.contains('*') {
                    return Err(AppError::ConfigError(format!(
                        "{name} entry '{entry}' contains a wildcard; only exact values are allowed"
                    )));
                }
            }
        }

        if self.production && self.hsts.max_age_secs == 0 {
            return Err(AppError::ConfigError(
                "HSTS max-age must be greater than 0 in production".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Security policy
            security: SecurityConfig::default(),
            // Background sweep
            sweep_interval: Duration::from_secs(300),
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let to_vec = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();

        Self {
            allowed_origins: to_vec(&DEFAULT_ALLOWED_ORIGINS),
            allowed_api_endpoints: to_vec(&DEFAULT_API_ENDPOINTS),
            allowed_image_domains: to_vec(&DEFAULT_IMAGE_DOMAINS),
            allowed_script_sources: to_vec(&DEFAULT_SCRIPT_SOURCES),
            allowed_style_sources: to_vec(&DEFAULT_STYLE_SOURCES),
            allowed_font_sources: to_vec(&DEFAULT_FONT_SOURCES),
            allowed_frame_sources: to_vec(&DEFAULT_FRAME_SOURCES),
            api_url: DEFAULT_API_URL.to_string(),
            rate_limit: RateLimitConfig::default(),
            hsts: HstsConfig::default(),
            production: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_general: 100,
            max_api: 50,
            max_login: 5,
            max_register: 3,
        }
    }
}

impl Default for HstsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 31_536_000, // 1 year
            include_subdomains: true,
            preload: true,
        }
    }
}
