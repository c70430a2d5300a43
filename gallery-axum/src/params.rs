//! Query strings and request headers, as the handlers read them.
//!
//! Every field is a raw optional string so that odd input turns into the
//! gateway's own JSON errors instead of an extractor rejection.

use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use gallery_core::{FitMode, ForwardedHeaders, GalleryError, ImageFormat, TransformOptions};
use serde::Deserialize;

use crate::GalleryAxumError;

pub const FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const FORWARDED_HOST: &str = "x-forwarded-host";

pub fn map_query_rejection(rejection: QueryRejection) -> GalleryAxumError {
    tracing::debug!(target: "gallery", %rejection, "query rejected");
    GalleryError::bad_request("Invalid query string").into()
}

/// `GET /assets`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

impl ListQuery {
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Unparseable or non-positive limits fall back to the default page size.
    pub fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|l| *l > 0)
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// `GET /assets/serve`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServeQuery {
    pub key: Option<String>,
    pub download: Option<String>,
}

impl ServeQuery {
    pub fn download(&self) -> bool {
        matches!(self.download.as_deref(), Some("1") | Some("true"))
    }
}

/// `GET /assets/url`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlQuery {
    pub key: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
    pub fit: Option<String>,
    pub q: Option<String>,
    pub fm: Option<String>,
}

impl UrlQuery {
    pub fn transform_options(&self) -> Result<TransformOptions, GalleryError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }
        fn invalid() -> GalleryError {
            GalleryError::bad_request("Invalid transform options")
        }

        let mut options = TransformOptions::new();
        if let Some(w) = present(&self.w) {
            options = options.with_width(w.parse().map_err(|_| invalid())?);
        }
        if let Some(h) = present(&self.h) {
            options = options.with_height(h.parse().map_err(|_| invalid())?);
        }
        if let Some(fit) = present(&self.fit) {
            options = options.with_fit(fit.parse::<FitMode>().map_err(|_| invalid())?);
        }
        if let Some(q) = present(&self.q) {
            options = options.with_quality(q.parse::<u32>().map_err(|_| invalid())?);
        }
        if let Some(fm) = present(&self.fm) {
            options = options.with_format(fm.parse::<ImageFormat>().map_err(|_| invalid())?);
        }
        Ok(options)
    }
}

/// `X-Forwarded-Proto` / `X-Forwarded-Host`, when they are valid strings.
///
/// The plain `Host` header is not consulted.
pub fn forwarded_headers(headers: &HeaderMap) -> ForwardedHeaders {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    ForwardedHeaders::new(read(FORWARDED_PROTO), read(FORWARDED_HOST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn lenient_limit() {
        let q = |limit: &str| ListQuery {
            limit: Some(limit.to_string()),
            ..Default::default()
        };
        assert_eq!(q("25").limit(), Some(25));
        assert_eq!(q("abc").limit(), None);
        assert_eq!(q("0").limit(), None);
        assert_eq!(q("-3").limit(), None);
        assert_eq!(ListQuery::default().prefix(), "");
    }

    #[test]
    fn download_flag() {
        let q = |d: Option<&str>| ServeQuery {
            key: None,
            download: d.map(str::to_string),
        };
        assert!(q(Some("1")).download());
        assert!(!q(Some("0")).download());
        assert!(!q(None).download());
    }

    #[test]
    fn transform_options_parse() {
        let query = UrlQuery {
            w: Some("640".into()),
            fit: Some("cover".into()),
            q: Some("80".into()),
            fm: Some("webp".into()),
            ..Default::default()
        };
        let options = query.transform_options().unwrap();
        assert_eq!(options.width, Some(640));
        assert_eq!(options.fit, Some(FitMode::Cover));
        assert_eq!(options.quality, Some(80));
        assert_eq!(options.format, Some(ImageFormat::Webp));

        let bad = UrlQuery {
            fit: Some("stretch".into()),
            ..Default::default()
        };
        assert_eq!(bad.transform_options().unwrap_err().code(), 400);
    }

    #[test]
    fn quality_is_clamped_not_rejected() {
        let quality = |q: &str| {
            UrlQuery {
                q: Some(q.to_string()),
                ..Default::default()
            }
            .transform_options()
            .unwrap()
            .quality
        };
        assert_eq!(quality("101"), Some(100));
        assert_eq!(quality("256"), Some(100));
        assert_eq!(quality("5000"), Some(100));
        assert_eq!(quality("0"), Some(1));

        let bad = UrlQuery {
            q: Some("high".into()),
            ..Default::default()
        };
        assert_eq!(bad.transform_options().unwrap_err().code(), 400);
    }

    #[test]
    fn forwarded_headers_ignore_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8080"));
        assert_eq!(forwarded_headers(&headers), ForwardedHeaders::default());

        headers.insert(FORWARDED_HOST, HeaderValue::from_static("photos.example.com"));
        let fwd = forwarded_headers(&headers);
        assert_eq!(fwd.host.as_deref(), Some("photos.example.com"));
        assert_eq!(fwd.proto, None);
    }
}
