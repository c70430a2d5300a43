use std::sync::Arc;

use anyhow::{bail, Result};
use gallery_blob::{BlobStore, MemoryBlobStore, S3CompatibleStore};
use gallery_core::{GalleryConfig, GalleryConfigSnapshot};

pub const ENV_PREFIX: &str = "GALLERY__";

/// Defaults, then `GALLERY__*` environment overrides.
pub fn gateway_config() -> GalleryConfig {
    let mut config = defaults();
    config.load_env(ENV_PREFIX);
    config
}

pub fn defaults() -> GalleryConfig {
    let mut config = GalleryConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3000");
    config.set("store.backend", "memory");
    config.set("log.format", "pretty");
    config
}

/// The store named by `store.backend`.
pub async fn open_store(snapshot: &GalleryConfigSnapshot) -> Result<Arc<dyn BlobStore>> {
    let backend = snapshot.get("store.backend").unwrap_or("memory");
    match backend {
        "memory" => {
            tracing::warn!(target: "gallery", "using the in-memory store; nothing is persisted");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
        "s3" => {
            let Some(bucket) = snapshot.get_string("store.bucket") else {
                bail!("store.bucket is required for the s3 backend");
            };
            let store = S3CompatibleStore::from_env(bucket.clone()).await?;
            tracing::info!(target: "gallery", %bucket, "using s3-compatible store");
            Ok(Arc::new(store))
        }
        other => bail!("unknown store.backend `{other}` (expected memory or s3)"),
    }
}
