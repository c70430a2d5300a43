//! Resumable, limit-bounded pagination over a store's prefix listing.
//!
//! Stores hand back every match for a prefix in one call, so paging is an
//! in-memory slice over that enumeration. The cursor is the last key of the
//! previous page and the enumeration is never reordered here.

use std::sync::Arc;

use gallery_core::{GalleryError, GatewayConfig, GatewayLogger, TracingLogger, TtlCache};
use serde::Serialize;

use crate::keys::{derive_filename, validate};
use crate::{BlobError, BlobStore, StoreEntry};

/// Listing-time view of one stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub key: String,
    pub etag: String,
    pub filename: String,
}

impl From<&StoreEntry> for AssetRecord {
    fn from(entry: &StoreEntry) -> Self {
        Self {
            key: entry.key.clone(),
            etag: entry.etag.clone(),
            filename: derive_filename(&entry.key).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPage {
    pub records: Vec<AssetRecord>,
    /// Last key of this page, present only when `has_more`.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Every key under the prefix, regardless of page size.
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("Invalid prefix")]
    InvalidPrefix,

    #[error("Invalid cursor")]
    InvalidCursor,

    #[error("Asset store unavailable")]
    StoreUnavailable(#[source] BlobError),

    #[error("Failed to list assets")]
    Failed(#[source] BlobError),
}

impl ListError {
    pub fn status_code(&self) -> u16 {
        match self {
            ListError::InvalidPrefix | ListError::InvalidCursor => 400,
            ListError::StoreUnavailable(_) => 503,
            ListError::Failed(_) => 500,
        }
    }

    pub fn into_gallery_error(self) -> GalleryError {
        let message = self.to_string();
        match self {
            ListError::InvalidPrefix | ListError::InvalidCursor => {
                GalleryError::bad_request(message)
            }
            ListError::StoreUnavailable(source) => {
                GalleryError::unavailable(message).with_source(source.into())
            }
            ListError::Failed(source) => {
                GalleryError::general_error(message).with_source(source.into())
            }
        }
    }
}

impl From<BlobError> for ListError {
    fn from(err: BlobError) -> Self {
        if err.is_unavailable() || matches!(err, BlobError::Io { .. }) {
            ListError::StoreUnavailable(err)
        } else {
            ListError::Failed(err)
        }
    }
}

pub struct ListingPaginator {
    store: Arc<dyn BlobStore>,
    config: GatewayConfig,
    cache: TtlCache<String, Arc<Vec<StoreEntry>>>,
    logger: Arc<dyn GatewayLogger>,
}

impl ListingPaginator {
    pub fn new(store: Arc<dyn BlobStore>, config: GatewayConfig) -> Self {
        let cache = TtlCache::new(config.listing_cache_ttl);
        Self {
            store,
            config,
            cache,
            logger: TracingLogger::shared(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn GatewayLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Swap the enumeration cache, e.g. for one driven by a manual clock.
    pub fn with_cache(mut self, cache: TtlCache<String, Arc<Vec<StoreEntry>>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// One page of `prefix`, starting right after `cursor`.
    pub async fn list(
        &self,
        prefix: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<AssetPage, ListError> {
        if !prefix.is_empty() && !validate(prefix) {
            return Err(ListError::InvalidPrefix);
        }
        let limit = self.config.clamp_limit(limit);
        let entries = self.enumerate(prefix).await?;

        let offset = match cursor.filter(|c| !c.is_empty()) {
            None => 0,
            Some(cursor) if !validate(cursor) => return Err(ListError::InvalidCursor),
            Some(cursor) => match entries.iter().position(|e| e.key == cursor) {
                Some(pos) => pos + 1,
                None => {
                    // Cursor key was removed since the last page: resume at the
                    // first key that sorts after it, in store order.
                    let resume = entries
                        .iter()
                        .position(|e| e.key.as_str() > cursor)
                        .unwrap_or(entries.len());
                    self.logger.debug(
                        "listing cursor not found, resuming after it",
                        &[("prefix", &prefix), ("cursor", &cursor), ("resume", &resume)],
                    );
                    resume
                }
            },
        };

        let end = offset.saturating_add(limit).min(entries.len());
        let records: Vec<AssetRecord> = entries[offset..end].iter().map(AssetRecord::from).collect();
        let has_more = entries.len() > end;
        let next_cursor = if has_more {
            records.last().map(|r| r.key.clone())
        } else {
            None
        };

        Ok(AssetPage {
            records,
            next_cursor,
            has_more,
            total: entries.len(),
        })
    }

    async fn enumerate(&self, prefix: &str) -> Result<Arc<Vec<StoreEntry>>, ListError> {
        let cache_key = prefix.to_string();
        if let Some(entries) = self.cache.get(&cache_key) {
            return Ok(entries);
        }

        let entries = match self.store.list(prefix).await {
            Ok(entries) => Arc::new(entries),
            Err(err) => {
                let err = ListError::from(err);
                let cause = match &err {
                    ListError::StoreUnavailable(source) | ListError::Failed(source) => {
                        source.to_string()
                    }
                    other => other.to_string(),
                };
                let store = self.store.name();
                self.logger.error(
                    "listing failed",
                    &[("prefix", &prefix), ("store", &store), ("cause", &cause)],
                );
                return Err(err);
            }
        };

        self.cache.insert(cache_key, entries.clone());
        Ok(entries)
    }
}
