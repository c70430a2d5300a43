//! Absolute origin resolution for building CDN transform URLs.
//!
//! Precedence in a server context is forwarded headers, then the configured
//! site URL, then the hardcoded default. Forwarded headers are trusted as-is:
//! if anything upstream of the trusted proxy can set `X-Forwarded-Host`, it
//! can steer the origin, and the configured URL will not override it.

use crate::config::DEFAULT_ORIGIN;

/// Where the URL is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Running with access to the end-user's location (e.g. `window.location.origin`).
    Browser { location_origin: String },
    /// Server-side rendering or API handler.
    Server(ForwardedHeaders),
}

/// The forwarding headers of the incoming request, raw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders {
    pub proto: Option<String>,
    pub host: Option<String>,
}

impl ForwardedHeaders {
    pub fn new(proto: Option<String>, host: Option<String>) -> Self {
        Self { proto, host }
    }
}

#[derive(Debug, Clone)]
pub struct OriginResolver {
    site_url: Option<String>,
    default_origin: String,
}

impl Default for OriginResolver {
    fn default() -> Self {
        Self {
            site_url: None,
            default_origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl OriginResolver {
    pub fn new(site_url: Option<String>, default_origin: impl Into<String>) -> Self {
        Self {
            site_url,
            default_origin: default_origin.into(),
        }
    }

    pub fn from_config(config: &crate::GatewayConfig) -> Self {
        Self::new(config.site_url.clone(), config.default_origin.clone())
    }

    /// Always returns `scheme://host[:port]` with no trailing slash.
    pub fn resolve(&self, ctx: &ExecutionContext) -> String {
        match ctx {
            ExecutionContext::Browser { location_origin } => normalize_origin(location_origin)
                .unwrap_or_else(|| self.fallback()),
            ExecutionContext::Server(headers) => self.resolve_server(headers),
        }
    }

    fn resolve_server(&self, headers: &ForwardedHeaders) -> String {
        if let Some(host) = headers.host.as_deref().and_then(first_value) {
            let proto = headers
                .proto
                .as_deref()
                .and_then(first_value)
                .filter(|p| p.eq_ignore_ascii_case("http") || p.eq_ignore_ascii_case("https"))
                .map(|p| p.to_ascii_lowercase())
                .unwrap_or_else(|| "https".to_string());
            if is_plausible_host(host) {
                return format!("{proto}://{host}");
            }
        }
        self.fallback()
    }

    fn fallback(&self) -> String {
        self.site_url
            .as_deref()
            .and_then(normalize_origin)
            .or_else(|| normalize_origin(&self.default_origin))
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string())
    }
}

/// Proxies append to forwarding headers; the client-facing hop is the first entry.
fn first_value(raw: &str) -> Option<&str> {
    raw.split(',').map(str::trim).find(|s| !s.is_empty())
}

fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

/// Reduce `https://host:port/some/path` to `https://host:port`.
fn normalize_origin(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (scheme, rest) = raw.split_once("://")?;
    if !(scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")) {
        return None;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if !is_plausible_host(authority) {
        return None;
    }
    Some(format!("{}://{}", scheme.to_ascii_lowercase(), authority))
}
