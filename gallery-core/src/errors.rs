//! # Errors
//!
//! The gateway speaks a small, fixed error vocabulary to its clients:
//! every failure is reduced to an HTTP status plus a one-line message,
//! serialised as `{ "error": "<message>" }`.
//!
//! Core goals:
//! - consistent status codes per kind
//! - can be carried through `anyhow::Error` and recovered by downcast
//! - transport-agnostic (the server crate decides how to write it out)
//! - the underlying cause stays server-side (`sanitize_for_client` drops it)

use std::fmt;

use anyhow::Error as AnyError;

/// Error classes the gateway can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,   // 400
    NotFound,     // 404
    GeneralError, // 500
    Unavailable,  // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }
}

/// A structured gallery error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct GalleryError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl GalleryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Turn any error into a GalleryError:
    /// - if it's already a GalleryError, keep it
    /// - otherwise wrap as GeneralError with a generic message
    pub fn normalize(err: AnyError) -> GalleryError {
        match err.downcast::<GalleryError>() {
            Ok(gallery) => gallery,
            Err(other) => GalleryError::general_error("Internal server error").with_source(other),
        }
    }

    /// Copy without the inner `source`, suitable for returning to clients.
    pub fn sanitize_for_client(&self) -> GalleryError {
        GalleryError {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for GalleryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl GalleryError {
    /// Wire payload: `{ "error": "<message>" }`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_gallery_errors() {
        let err = GalleryError::not_found("Asset not found").into_anyhow();
        let normalized = GalleryError::normalize(err);
        assert_eq!(normalized.code(), 404);
        assert_eq!(normalized.message, "Asset not found");
    }

    #[test]
    fn normalize_hides_foreign_messages() {
        let err = anyhow::anyhow!("connection reset by peer at 10.0.0.4");
        let normalized = GalleryError::normalize(err);
        assert_eq!(normalized.code(), 500);
        assert_eq!(normalized.message, "Internal server error");
        assert!(normalized.source.is_some());
        assert!(normalized.sanitize_for_client().source.is_none());
    }
}
