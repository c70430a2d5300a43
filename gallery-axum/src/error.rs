use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gallery_blob::{ListError, ServeError};
use gallery_core::errors::GalleryError;

#[derive(Debug)]
pub struct GalleryAxumError(pub anyhow::Error);

impl From<anyhow::Error> for GalleryAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<GalleryError> for GalleryAxumError {
    fn from(e: GalleryError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<ServeError> for GalleryAxumError {
    fn from(e: ServeError) -> Self {
        e.into_gallery_error().into()
    }
}

impl From<ListError> for GalleryAxumError {
    fn from(e: ListError) -> Self {
        e.into_gallery_error().into()
    }
}

impl IntoResponse for GalleryAxumError {
    fn into_response(self) -> Response {
        // A GalleryError anywhere in the chain keeps its status and public message
        if let Some(gallery) = self.0.chain().find_map(|e| e.downcast_ref::<GalleryError>()) {
            let safe = gallery.sanitize_for_client();
            let status = StatusCode::from_u16(safe.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        // Anything else is a 500 whose message never reaches the client
        tracing::error!(target: "gallery", error = %self.0, "unhandled error");
        let safe = GalleryError::normalize(self.0).sanitize_for_client();
        let status = StatusCode::from_u16(safe.code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
