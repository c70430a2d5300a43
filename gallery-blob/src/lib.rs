//! # gallery-blob: read-only asset gateway over a blob store
//!
//! `gallery-blob` holds everything between an HTTP handler and the object
//! store, with no HTTP coupling:
//!
//! - **Key codec**: validation, capture timestamps, status tokens, filenames
//! - **Content sniffing** on a bounded 16-byte prefix, never the whole file
//! - **Listing pagination**: cursor = last key of the previous page, limit capped at 200
//! - **Serve pipeline**: validate, one `get_with_metadata` round trip, headers, pass-through stream
//! - **Stores**: in-memory and S3-compatible, both behind [`BlobStore`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gallery_blob::prelude::*;
//! use gallery_core::GatewayConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryBlobStore::new());
//! store.put("parties/2025/a.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0], None);
//!
//! let gateway = AssetGateway::new(store.clone(), GatewayConfig::default());
//! let asset = gateway.serve(Some("parties/2025/a.jpg"), ServeOptions::default()).await?;
//! assert_eq!(asset.content_type(), "image/jpeg");
//!
//! let listing = ListingPaginator::new(store, GatewayConfig::default());
//! let page = listing.list("parties/", Some(60), None).await?;
//! assert_eq!(page.total, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │  HTTP binding (gallery-axum)       │
//! ├──────────────────┬─────────────────┤
//! │  AssetGateway    │ ListingPaginator│  ← validation, sniffing, paging
//! ├──────────────────┴─────────────────┤
//! │  BlobStore                         │  ← list + get_with_metadata
//! └────────────────────────────────────┘
//! ```

mod error;
pub mod gateway;
pub mod keys;
pub mod listing;
mod memory_store;
mod s3_store;
pub mod sniff;
pub mod store;
mod types;

pub use error::{BlobError, BlobResult};
pub use gateway::{AssetGateway, ServeError, ServeOptions, ServedAsset};
pub use keys::{AssetKey, KeyError, KeyShape, PickStatus};
pub use listing::{AssetPage, AssetRecord, ListError, ListingPaginator};
pub use memory_store::MemoryBlobStore;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::BlobStore;
pub use types::{BlobBody, ByteReader, ByteStream, StoreEntry, StoredBlob};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetGateway, AssetKey, AssetPage, BlobError, BlobResult, BlobStore, ByteStream,
        ListingPaginator, MemoryBlobStore, ServeOptions,
    };
}
