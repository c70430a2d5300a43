//! # Gallery Configuration
//!
//! Configuration is a flat string key/value store with dotted keys,
//! layered by the application however it likes:
//!
//! ```rust
//! use gallery_core::GalleryConfig;
//! let mut config = GalleryConfig::new();
//!
//! config.set("listing.default_limit", "60");
//! config.set("site.url", "https://photos.example.com");
//!
//! assert_eq!(config.get("site.url"), Some("https://photos.example.com"));
//! ```
//!
//! ## Environment overrides
//! `load_env` copies every variable starting with a prefix into the store,
//! lower-casing it and turning `__` into `.`:
//!
//! ```bash
//! export GALLERY__SITE__URL=https://photos.example.com   # site.url
//! export GALLERY__LISTING__CACHE_TTL_SECS=30             # listing.cache_ttl_secs
//! ```
//!
//! A `GalleryConfigSnapshot` is then turned into the typed `GatewayConfig`.

use std::collections::HashMap;
use std::time::Duration;

/// Hard ceiling on listing page size.
pub const MAX_LISTING_LIMIT: usize = 200;
/// Page size used when the client does not ask for one.
pub const DEFAULT_LISTING_LIMIT: usize = 60;
/// Origin used when nothing better is known.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";
/// One year, the browser/edge max-age for immutable assets.
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 31_536_000;

#[derive(Debug, Default)]
pub struct GalleryConfig {
    values: HashMap<String, String>,
}

impl GalleryConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Load overrides from process environment variables carrying `prefix`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Same as `load_env`, over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    pub fn snapshot(&self) -> GalleryConfigSnapshot {
        GalleryConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GalleryConfigSnapshot {
    map: HashMap<String, String>,
}

impl GalleryConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

}

/// Typed settings the gateway runs with.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Explicit public site URL, used when no forwarded headers are present.
    pub site_url: Option<String>,
    /// Last-resort origin.
    pub default_origin: String,
    pub default_limit: usize,
    /// Clamped to `MAX_LISTING_LIMIT`.
    pub max_limit: usize,
    /// Zero disables listing enumeration caching.
    pub listing_cache_ttl: Duration,
    pub cache_max_age_secs: u64,
    /// Header carrying the edge/CDN cache policy.
    pub edge_cache_header: String,
    /// Header carrying the purge tag.
    pub cache_tag_header: String,
    /// Path of the image transform CDN endpoint.
    pub transform_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            default_origin: DEFAULT_ORIGIN.to_string(),
            default_limit: DEFAULT_LISTING_LIMIT,
            max_limit: MAX_LISTING_LIMIT,
            listing_cache_ttl: Duration::ZERO,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            edge_cache_header: "CDN-Cache-Control".to_string(),
            cache_tag_header: "Cache-Tag".to_string(),
            transform_path: "/.netlify/images".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &GalleryConfigSnapshot) -> Self {
        let defaults = Self::default();
        let max_limit = snapshot
            .get_usize("listing.max_limit")
            .unwrap_or(defaults.max_limit)
            .clamp(1, MAX_LISTING_LIMIT);
        let default_limit = snapshot
            .get_usize("listing.default_limit")
            .unwrap_or(defaults.default_limit)
            .clamp(1, max_limit);

        Self {
            site_url: snapshot
                .get_string("site.url")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            default_origin: snapshot
                .get_string("origin.default")
                .unwrap_or(defaults.default_origin),
            default_limit,
            max_limit,
            listing_cache_ttl: snapshot
                .get_u64("listing.cache_ttl_secs")
                .map(Duration::from_secs)
                .unwrap_or(defaults.listing_cache_ttl),
            cache_max_age_secs: snapshot
                .get_u64("cache.max_age_secs")
                .unwrap_or(defaults.cache_max_age_secs),
            edge_cache_header: snapshot
                .get_string("cache.edge_header")
                .unwrap_or(defaults.edge_cache_header),
            cache_tag_header: snapshot
                .get_string("cache.tag_header")
                .unwrap_or(defaults.cache_tag_header),
            transform_path: snapshot
                .get_string("transform.path")
                .unwrap_or(defaults.transform_path),
        }
    }

    pub fn with_site_url<S: Into<String>>(mut self, url: S) -> Self {
        self.site_url = Some(url.into());
        self
    }

    pub fn with_listing_cache_ttl(mut self, ttl: Duration) -> Self {
        self.listing_cache_ttl = ttl;
        self
    }

    /// Resolve a client-requested page size against the default and the ceiling.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        let ceiling = self.max_limit.clamp(1, MAX_LISTING_LIMIT);
        match requested {
            Some(0) | None => self.default_limit.clamp(1, ceiling),
            Some(n) => n.min(ceiling),
        }
    }
}
