//! Asset key codec.
//!
//! Keys look like `parties/2025/the-archive/2025FRED_20250807180510_UNPICKED`:
//! a `/`-separated path whose final part may carry a 14-digit capture
//! timestamp as one `_`-separated segment and a status token. None of the
//! functions here fail on odd input. Only [`validate`] rejects, and only the
//! serve path acts on that.

use std::fmt;

use chrono::NaiveDateTime;

pub const PICKED: &str = "PICKED";
pub const UNPICKED: &str = "UNPICKED";

const TIMESTAMP_LEN: usize = 14;

/// True iff `key` is non-empty and made only of `[A-Za-z0-9._/-]`.
pub fn validate(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'/' | b'-'))
}

/// First `_`-separated segment that is exactly 14 ASCII digits.
pub fn extract_timestamp(key: &str) -> Option<&str> {
    key.split('_')
        .find(|seg| seg.len() == TIMESTAMP_LEN && seg.bytes().all(|b| b.is_ascii_digit()))
}

/// Timestamp for ordering; keys without one sort first.
pub fn capture_sort_key(key: &str) -> &str {
    extract_timestamp(key).unwrap_or("")
}

/// The timestamp as a calendar value, when it is a real date.
pub fn captured_at(key: &str) -> Option<NaiveDateTime> {
    extract_timestamp(key).and_then(|ts| NaiveDateTime::parse_from_str(ts, "%Y%m%d%H%M%S").ok())
}

/// Case-sensitive substring check.
///
/// `has_status_token("x_UNPICKED", "PICKED")` is true. Use [`pick_status`]
/// to tell picked from unpicked.
pub fn has_status_token(key: &str, token: &str) -> bool {
    key.contains(token)
}

/// Final `/`-separated segment, or the whole key.
pub fn derive_filename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickStatus {
    Picked,
    Unpicked,
    Unmarked,
}

/// `UNPICKED` is checked first since it contains `PICKED`.
pub fn pick_status(key: &str) -> PickStatus {
    if has_status_token(key, UNPICKED) {
        PickStatus::Unpicked
    } else if has_status_token(key, PICKED) {
        PickStatus::Picked
    } else {
        PickStatus::Unmarked
    }
}

/// Best-effort reading of a key's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape<'a> {
    Captured { timestamp: &'a str, status: PickStatus },
    /// No recognisable capture timestamp
    Raw,
}

pub fn classify(key: &str) -> KeyShape<'_> {
    match extract_timestamp(key) {
        Some(timestamp) => KeyShape::Captured {
            timestamp,
            status: pick_status(key),
        },
        None => KeyShape::Raw,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    Missing,
    InvalidFormat,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Missing => f.write_str("Missing key"),
            KeyError::InvalidFormat => f.write_str("Invalid key format"),
        }
    }
}

impl std::error::Error for KeyError {}

/// A key that passed [`validate`] and may address the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn parse(raw: Option<&str>) -> Result<Self, KeyError> {
        match raw {
            None | Some("") => Err(KeyError::Missing),
            Some(key) if validate(key) => Ok(Self(key.to_string())),
            Some(_) => Err(KeyError::InvalidFormat),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn filename(&self) -> &str {
        derive_filename(&self.0)
    }

}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
