use std::sync::Arc;

use gallery_blob::{AssetGateway, BlobStore, ListingPaginator};
use gallery_core::{GatewayConfig, GatewayLogger, OriginResolver, TracingLogger};

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<AssetGateway>,
    pub listing: Arc<ListingPaginator>,
    pub origin: Arc<OriginResolver>,
    pub config: Arc<GatewayConfig>,
}

impl GatewayState {
    pub fn new(store: Arc<dyn BlobStore>, config: GatewayConfig) -> Self {
        Self::with_logger(store, config, TracingLogger::shared())
    }

    pub fn with_logger(
        store: Arc<dyn BlobStore>,
        config: GatewayConfig,
        logger: Arc<dyn GatewayLogger>,
    ) -> Self {
        let gateway = AssetGateway::new(Arc::clone(&store), config.clone())
            .with_logger(Arc::clone(&logger));
        let listing = ListingPaginator::new(store, config.clone()).with_logger(logger);

        Self {
            gateway: Arc::new(gateway),
            listing: Arc::new(listing),
            origin: Arc::new(OriginResolver::from_config(&config)),
            config: Arc::new(config),
        }
    }
}
