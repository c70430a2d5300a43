//! The serve pipeline: key in, headers plus a pass-through byte stream out.
//!
//! The key is validated before the store is touched. Body and metadata come
//! from one `get_with_metadata` round trip. When the upload recorded no
//! content type, only the first [`SNIFF_LEN`] bytes are pulled to sniff one,
//! then replayed in front of the rest of the stream.

use std::sync::Arc;

use futures::TryStreamExt;
use gallery_core::{GalleryError, GatewayConfig, GatewayLogger, TracingLogger};

use crate::keys::{AssetKey, KeyError};
use crate::sniff::{peek_prefix, sniff, SNIFF_LEN};
use crate::{BlobError, BlobStore, ByteStream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeOptions {
    /// Ask the browser to save rather than display.
    pub download: bool,
}

impl ServeOptions {
    pub fn download() -> Self {
        Self { download: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Missing key")]
    MissingKey,

    #[error("Invalid key format")]
    InvalidKeyFormat,

    #[error("Asset not found")]
    AssetNotFound,

    #[error("Failed to serve asset")]
    StoreUnavailable(#[source] BlobError),

    #[error("Failed to serve asset")]
    ServeFailed(#[source] BlobError),
}

impl ServeError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServeError::MissingKey | ServeError::InvalidKeyFormat => 400,
            ServeError::AssetNotFound => 404,
            ServeError::StoreUnavailable(_) | ServeError::ServeFailed(_) => 500,
        }
    }

    pub fn into_gallery_error(self) -> GalleryError {
        let message = self.to_string();
        match self {
            ServeError::MissingKey | ServeError::InvalidKeyFormat => {
                GalleryError::bad_request(message)
            }
            ServeError::AssetNotFound => GalleryError::not_found(message),
            ServeError::StoreUnavailable(source) | ServeError::ServeFailed(source) => {
                GalleryError::general_error(message).with_source(source.into())
            }
        }
    }
}

impl From<KeyError> for ServeError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Missing => ServeError::MissingKey,
            KeyError::InvalidFormat => ServeError::InvalidKeyFormat,
        }
    }
}

impl From<BlobError> for ServeError {
    fn from(err: BlobError) -> Self {
        if err.is_not_found() {
            ServeError::AssetNotFound
        } else if err.is_unavailable() {
            ServeError::StoreUnavailable(err)
        } else {
            ServeError::ServeFailed(err)
        }
    }
}

/// A resolved asset, ready to be written out.
pub struct ServedAsset {
    key: AssetKey,
    content_type: String,
    content_length: Option<u64>,
    headers: Vec<(String, String)>,
    body: ByteStream,
}

impl ServedAsset {
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Response headers, `Content-Type` first.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_body(self) -> ByteStream {
        self.body
    }
}

impl std::fmt::Debug for ServedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServedAsset")
            .field("key", &self.key)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

pub struct AssetGateway {
    store: Arc<dyn BlobStore>,
    config: GatewayConfig,
    logger: Arc<dyn GatewayLogger>,
}

impl AssetGateway {
    pub fn new(store: Arc<dyn BlobStore>, config: GatewayConfig) -> Self {
        Self {
            store,
            config,
            logger: TracingLogger::shared(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn GatewayLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn serve(
        &self,
        key: Option<&str>,
        options: ServeOptions,
    ) -> Result<ServedAsset, ServeError> {
        let key = match AssetKey::parse(key) {
            Ok(key) => key,
            Err(err) => {
                let raw = key.unwrap_or_default();
                self.logger
                    .debug("rejected serve key", &[("key", &raw), ("reason", &err)]);
                return Err(err.into());
            }
        };

        match self.resolve(&key, options).await {
            Ok(asset) => Ok(asset),
            Err(ServeError::AssetNotFound) => {
                self.logger.debug("asset not found", &[("key", &key)]);
                Err(ServeError::AssetNotFound)
            }
            Err(err) => {
                let cause = match &err {
                    ServeError::StoreUnavailable(source) | ServeError::ServeFailed(source) => {
                        source.to_string()
                    }
                    other => other.to_string(),
                };
                let store = self.store.name();
                self.logger.error(
                    "serve failed",
                    &[("key", &key), ("store", &store), ("cause", &cause)],
                );
                Err(err)
            }
        }
    }

    async fn resolve(&self, key: &AssetKey, options: ServeOptions) -> Result<ServedAsset, ServeError> {
        let blob = self.store.get_with_metadata(key.as_str()).await?;
        let stream = blob.body.into_stream();

        let (content_type, stream) = match blob.content_type {
            Some(content_type) => (content_type, stream),
            None => {
                let (prefix, stream) = peek_prefix(stream, SNIFF_LEN)
                    .await
                    .map_err(|err| ServeError::ServeFailed(err.into()))?;
                (sniff(&prefix, key.as_str()).to_string(), stream)
            }
        };

        let headers = self.headers_for(key, &content_type, blob.size_hint, options);
        let body = self.watch_stream(key, stream);

        Ok(ServedAsset {
            key: key.clone(),
            content_type,
            content_length: blob.size_hint,
            headers,
            body,
        })
    }

    fn headers_for(
        &self,
        key: &AssetKey,
        content_type: &str,
        size: Option<u64>,
        options: ServeOptions,
    ) -> Vec<(String, String)> {
        let cache_control = format!(
            "public, max-age={}, immutable",
            self.config.cache_max_age_secs
        );
        let mut headers = vec![
            ("Content-Type".to_string(), content_type.to_string()),
            ("Cache-Control".to_string(), cache_control.clone()),
            (self.config.edge_cache_header.clone(), cache_control),
            (self.config.cache_tag_header.clone(), key.to_string()),
            ("X-Content-Type-Options".to_string(), "nosniff".to_string()),
        ];
        if options.download {
            headers.push((
                "Content-Disposition".to_string(),
                format!("attachment; filename=\"{}\"", key.filename()),
            ));
        }
        if let Some(size) = size {
            headers.push(("Content-Length".to_string(), size.to_string()));
        }
        headers
    }

    /// Status is already sent once the body flows, so stream errors can only
    /// be logged before they abort the response.
    fn watch_stream(&self, key: &AssetKey, stream: ByteStream) -> ByteStream {
        let logger = self.logger.clone();
        let key = key.clone();
        Box::pin(stream.inspect_err(move |err| {
            logger.error("serve stream failed", &[("key", &key), ("cause", err)]);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobBody, BlobResult, MemoryBlobStore, StoreEntry, StoredBlob};
    use async_trait::async_trait;
    use bytes::Bytes;
    use gallery_core::{LogLevel, MemoryLogger};
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const KEY: &str = "parties/2025/the-archive/2025FRED_20250807180510_PICKED";

    #[derive(Default)]
    struct SpyStore {
        inner: MemoryBlobStore,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for SpyStore {
        async fn list(&self, prefix: &str) -> BlobResult<Vec<StoreEntry>> {
            self.inner.list(prefix).await
        }

        async fn get_with_metadata(&self, key: &str) -> BlobResult<StoredBlob> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get_with_metadata(key).await
        }

        fn name(&self) -> &'static str {
            "spy"
        }
    }

    /// Hands out a stream that fails after its first chunk.
    struct FlakyStore;

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn list(&self, _prefix: &str) -> BlobResult<Vec<StoreEntry>> {
            Ok(Vec::new())
        }

        async fn get_with_metadata(&self, key: &str) -> BlobResult<StoredBlob> {
            if key.starts_with("timeout") {
                return Err(BlobError::unavailable(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timeout",
                )));
            }
            let chunks: Vec<std::io::Result<Bytes>> = vec![
                Ok(Bytes::from_static(b"\x89PNG\r\n\x1a\n0123456789")),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            ];
            Ok(StoredBlob::new(BlobBody::Stream(Box::pin(futures::stream::iter(chunks)))))
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl DropFlag {
        fn hold(&self) {}
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Serves an endless PNG-looking stream of 8-byte chunks with no
    /// recorded content type, counting every chunk pulled from it.
    #[derive(Default)]
    struct EndlessStore {
        pulled: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BlobStore for EndlessStore {
        async fn list(&self, _prefix: &str) -> BlobResult<Vec<StoreEntry>> {
            Ok(Vec::new())
        }

        async fn get_with_metadata(&self, _key: &str) -> BlobResult<StoredBlob> {
            let pulled = self.pulled.clone();
            let guard = DropFlag(self.dropped.clone());
            let chunks = futures::stream::repeat_with(move || {
                guard.hold();
                pulled.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(Bytes::from_static(b"\x89PNG\r\n\x1a\n"))
            });
            Ok(StoredBlob::new(BlobBody::Stream(Box::pin(chunks))))
        }

        fn name(&self) -> &'static str {
            "endless"
        }
    }

    fn gateway(store: Arc<dyn BlobStore>) -> (AssetGateway, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let gateway = AssetGateway::new(store, GatewayConfig::default()).with_logger(logger.clone());
        (gateway, logger)
    }

    async fn body_of(asset: ServedAsset) -> Vec<u8> {
        let chunks: Vec<Bytes> = asset.into_body().try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn invalid_keys_never_reach_the_store() {
        let spy = Arc::new(SpyStore::default());
        let (gateway, logger) = gateway(spy.clone());

        let err = gateway.serve(Some("a$b"), ServeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServeError::InvalidKeyFormat));
        assert_eq!(err.status_code(), 400);

        let err = gateway.serve(None, ServeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServeError::MissingKey));

        let err = gateway.serve(Some(""), ServeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServeError::MissingKey));

        assert_eq!(spy.gets.load(Ordering::SeqCst), 0);
        assert!(logger.at_level(LogLevel::Error).is_empty());
    }

    #[tokio::test]
    async fn round_trip_returns_exact_bytes() {
        let spy = Arc::new(SpyStore::default());
        let payload = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4, 5];
        spy.inner.put(KEY, payload.clone(), None);
        let (gateway, _) = gateway(spy.clone());

        let asset = gateway.serve(Some(KEY), ServeOptions::default()).await.unwrap();
        assert_eq!(asset.content_type(), "image/jpeg");
        assert_eq!(asset.content_length(), Some(payload.len() as u64));
        assert_eq!(body_of(asset).await, payload);
        assert_eq!(spy.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metadata_content_type_wins_over_sniffing() {
        let spy = Arc::new(SpyStore::default());
        spy.inner.put("a/b.jpg", vec![0x89, 0x50, 0x4E, 0x47], Some("image/avif"));
        let (gateway, _) = gateway(spy);

        let asset = gateway.serve(Some("a/b.jpg"), ServeOptions::default()).await.unwrap();
        assert_eq!(asset.content_type(), "image/avif");
    }

    #[tokio::test]
    async fn missing_asset_is_404_and_not_an_error_log() {
        let (gateway, logger) = gateway(Arc::new(SpyStore::default()));
        let err = gateway.serve(Some("gone.jpg"), ServeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServeError::AssetNotFound));
        assert_eq!(err.status_code(), 404);
        assert!(logger.at_level(LogLevel::Error).is_empty());
        assert_eq!(logger.at_level(LogLevel::Debug).len(), 1);
    }

    #[tokio::test]
    async fn cache_and_safety_headers() {
        let spy = Arc::new(SpyStore::default());
        spy.inner.put(KEY, vec![0xFF, 0xD8], None);
        let (gateway, _) = gateway(spy);

        let asset = gateway.serve(Some(KEY), ServeOptions::default()).await.unwrap();
        assert_eq!(
            asset.header("cache-control"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            asset.header("CDN-Cache-Control"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(asset.header("Cache-Tag"), Some(KEY));
        assert_eq!(asset.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(asset.header("Content-Disposition"), None);
        assert_eq!(asset.headers()[0].0, "Content-Type");
    }

    #[tokio::test]
    async fn download_adds_disposition() {
        let spy = Arc::new(SpyStore::default());
        spy.inner.put(KEY, vec![0xFF, 0xD8], None);
        let (gateway, _) = gateway(spy);

        let asset = gateway.serve(Some(KEY), ServeOptions::download()).await.unwrap();
        assert_eq!(
            asset.header("Content-Disposition"),
            Some("attachment; filename=\"2025FRED_20250807180510_PICKED\"")
        );
    }

    #[tokio::test]
    async fn store_outage_is_logged_with_key() {
        let (gateway, logger) = gateway(Arc::new(FlakyStore));
        let err = gateway
            .serve(Some("timeout/a.jpg"), ServeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(
            err.into_gallery_error().sanitize_for_client().message,
            "Failed to serve asset"
        );

        let errors = logger.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("key"), Some("timeout/a.jpg"));
        assert!(errors[0].field("cause").unwrap().contains("read timeout"));
    }

    #[tokio::test]
    async fn mid_stream_failure_is_logged_and_aborts_the_body() {
        let (gateway, logger) = gateway(Arc::new(FlakyStore));
        let asset = gateway.serve(Some("x/y"), ServeOptions::default()).await.unwrap();
        assert_eq!(asset.content_type(), "image/png");

        let result: Result<Vec<Bytes>, _> = asset.into_body().try_collect().await;
        assert!(result.is_err());

        let errors = logger.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("key"), Some("x/y"));
        assert_eq!(errors[0].field("cause"), Some("reset"));
    }

    #[tokio::test]
    async fn sniffing_pulls_only_the_prefix_chunks() {
        let store = Arc::new(EndlessStore::default());
        let (gateway, _) = gateway(store.clone());

        let asset = gateway.serve(Some("a/b"), ServeOptions::default()).await.unwrap();
        assert_eq!(asset.content_type(), "image/png");
        assert_eq!(asset.content_length(), None);
        // Two 8-byte chunks cover the 16-byte sniff window.
        assert_eq!(store.pulled.load(Ordering::SeqCst), 2);

        let mut body = asset.into_body();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..4], b"\x89PNG");
        body.next().await.unwrap().unwrap();
        assert_eq!(store.pulled.load(Ordering::SeqCst), 2);

        body.next().await.unwrap().unwrap();
        assert_eq!(store.pulled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dropping_the_body_releases_the_store_stream() {
        let store = Arc::new(EndlessStore::default());
        let (gateway, logger) = gateway(store.clone());

        let asset = gateway.serve(Some("a/b"), ServeOptions::default()).await.unwrap();
        let mut body = asset.into_body();
        body.next().await.unwrap().unwrap();
        assert!(!store.dropped.load(Ordering::SeqCst));

        drop(body);
        assert!(store.dropped.load(Ordering::SeqCst));
        assert!(logger.at_level(LogLevel::Error).is_empty());
    }
}
