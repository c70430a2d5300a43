use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use gallery_blob::{AssetKey, AssetPage, ServeOptions};
use gallery_core::{AssetUrls, ExecutionContext, GalleryError};
use serde::Serialize;

use crate::params::{forwarded_headers, map_query_rejection, ListQuery, ServeQuery, UrlQuery};
use crate::{GalleryAxumError, GatewayState};

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub key: String,
    pub filename: String,
}

/// `{ assets, cursor, hasMore, total }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetListResponse {
    pub assets: Vec<AssetSummary>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub total: usize,
}

impl From<AssetPage> for AssetListResponse {
    fn from(page: AssetPage) -> Self {
        Self {
            assets: page
                .records
                .into_iter()
                .map(|r| AssetSummary {
                    key: r.key,
                    filename: r.filename,
                })
                .collect(),
            cursor: page.next_cursor,
            has_more: page.has_more,
            total: page.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetUrlResponse {
    /// CDN transform URL
    pub url: String,
    /// Raw serve URL, the fallback when the transform fails
    pub original: String,
    pub download: String,
}

pub fn asset_router(state: GatewayState) -> Router<()> {
    Router::new()
        .route("/assets", get(list_assets))
        .route("/assets/serve", get(serve_asset))
        .route("/assets/url", get(asset_url))
        .route("/health", get(health))
        .with_state(state)
}

async fn list_assets(
    State(state): State<GatewayState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<AssetListResponse>, GalleryAxumError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let page = state
        .listing
        .list(query.prefix(), query.limit(), query.cursor())
        .await?;
    Ok(Json(page.into()))
}

async fn serve_asset(
    State(state): State<GatewayState>,
    query: Result<Query<ServeQuery>, QueryRejection>,
) -> Result<Response, GalleryAxumError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let options = ServeOptions {
        download: query.download(),
    };
    let asset = state.gateway.serve(query.key.as_deref(), options).await?;

    let mut response = Response::builder().status(StatusCode::OK);
    for (name, value) in asset.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => response = response.header(name, value),
            _ => tracing::warn!(target: "gallery", header = %name, "dropping unrepresentable header"),
        }
    }

    // Pass-through: dropping the body on disconnect drops the store stream too
    let body = Body::from_stream(asset.into_body());
    response.body(body).map_err(|err| {
        GalleryError::general_error("Failed to serve asset")
            .with_source(err.into())
            .into()
    })
}

async fn asset_url(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    query: Result<Query<UrlQuery>, QueryRejection>,
) -> Result<Json<AssetUrlResponse>, GalleryAxumError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let key = AssetKey::parse(query.key.as_deref())
        .map_err(|err| GalleryError::bad_request(err.to_string()))?;
    let options = query.transform_options()?;

    let origin = state
        .origin
        .resolve(&ExecutionContext::Server(forwarded_headers(&headers)));
    let urls = AssetUrls::new(origin, state.config.transform_path.as_str());

    Ok(Json(AssetUrlResponse {
        url: urls.transform_url(key.as_str(), &options),
        original: urls.serve_url(key.as_str()),
        download: urls.download_url(key.as_str()),
    }))
}

async fn health() -> &'static str {
    "ok"
}
