use std::sync::Arc;

use axum::http::{HeaderValue, Request};
use axum::Router;
use gallery_blob::BlobStore;
use gallery_core::GatewayConfig;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::routes::asset_router;
use crate::GatewayState;

/// UUID v4 request ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

#[derive(Clone)]
pub struct GalleryApp {
    pub state: GatewayState,
    pub router: Router<()>,
}

impl GalleryApp {
    pub fn new(state: GatewayState) -> Self {
        let router = asset_router(state.clone());
        Self { state, router }
    }

    /// The routes wrapped in request-id and trace layers.
    pub fn into_router(self) -> Router<()> {
        self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(target: "gallery", %local, "asset gateway listening");
        }
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

pub fn gallery(store: Arc<dyn BlobStore>, config: GatewayConfig) -> GalleryApp {
    GalleryApp::new(GatewayState::new(store, config))
}
