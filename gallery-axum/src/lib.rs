//! gallery-axum: Axum binding for the gallery asset gateway.
//!
//! Routes:
//!
//! - `GET /assets?prefix=&limit=&cursor=`: one listing page
//! - `GET /assets/serve?key=&download=1`: raw bytes, streamed
//! - `GET /assets/url?key=&w=&h=&fit=&q=&fm=`: CDN transform URL for a key
//! - `GET /health`

pub mod app;
mod error;
pub mod params;
pub mod routes;
pub mod state;

pub use app::{gallery, GalleryApp, UuidRequestId};
pub use axum;
pub use error::GalleryAxumError;
pub use state::GatewayState;
