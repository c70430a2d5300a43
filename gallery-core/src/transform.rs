//! URLs for the serve endpoint and the image transform CDN wrapped around it.
//!
//! The CDN fetches the inner `url` itself, so the inner URL has to be absolute
//! and fully percent-encoded as a single query component.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Path of the raw serve endpoint, relative to the origin.
pub const SERVE_PATH: &str = "/assets/serve";

/// Same unreserved set as JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    Contain,
    Cover,
    Fill,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Fill => "fill",
        }
    }
}

impl FromStr for FitMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            "fill" => Ok(FitMode::Fill),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Avif,
    Webp,
    Jpg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::Webp => "webp",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avif" => Ok(ImageFormat::Avif),
            "webp" => Ok(ImageFormat::Webp),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "png" => Ok(ImageFormat::Png),
            "gif" => Ok(ImageFormat::Gif),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resize parameters passed through to the CDN. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<FitMode>,
    pub quality: Option<u8>,
    pub format: Option<ImageFormat>,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Clamped to 1..=100.
    /// Clamped to 1..=100.
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = u8::try_from(quality.clamp(1, 100)).ok();
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Builds serve and transform URLs for one origin.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    origin: String,
    transform_path: String,
}

impl AssetUrls {
    pub fn new(origin: impl Into<String>, transform_path: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            transform_path: transform_path.into(),
        }
    }

    /// `<origin>/assets/serve?key=<key>`
    pub fn serve_url(&self, key: &str) -> String {
        format!("{}{}?key={}", self.origin, SERVE_PATH, encode_component(key))
    }

    /// `<origin>/assets/serve?key=<key>&download=1`
    pub fn download_url(&self, key: &str) -> String {
        format!("{}&download=1", self.serve_url(key))
    }

    /// `<transform-path>?url=<encoded serve url>&w=..&h=..&fit=..&q=..&fm=..`
    ///
    /// A transform path starting with `/` is made absolute against the origin.
    pub fn transform_url(&self, key: &str, options: &TransformOptions) -> String {
        let base = if self.transform_path.starts_with('/') {
            format!("{}{}", self.origin, self.transform_path)
        } else {
            self.transform_path.clone()
        };

        let mut url = format!("{}?url={}", base, encode_component(&self.serve_url(key)));
        if let Some(w) = options.width {
            url.push_str(&format!("&w={w}"));
        }
        if let Some(h) = options.height {
            url.push_str(&format!("&h={h}"));
        }
        if let Some(fit) = options.fit {
            url.push_str(&format!("&fit={}", fit.as_str()));
        }
        if let Some(q) = options.quality {
            url.push_str(&format!("&q={q}"));
        }
        if let Some(fm) = options.format {
            url.push_str(&format!("&fm={fm}"));
        }
        url
    }
}
