mod app;

use std::sync::Arc;

use anyhow::Result;
use gallery_axum::GalleryApp;
use gallery_blob::BlobStore;
use gallery_core::{GalleryConfig, GatewayConfig};

pub use app::{defaults, gateway_config, open_store, ENV_PREFIX};

/// Gateway over the store `config` names.
pub async fn build(config: &GalleryConfig) -> Result<GalleryApp> {
    let snapshot = config.snapshot();
    let store = open_store(&snapshot).await?;
    Ok(build_with_store(store, config))
}

/// Gateway over an already-open store.
pub fn build_with_store(store: Arc<dyn BlobStore>, config: &GalleryConfig) -> GalleryApp {
    let gateway = GatewayConfig::from_snapshot(&config.snapshot());
    gallery_axum::gallery(store, gateway)
}
