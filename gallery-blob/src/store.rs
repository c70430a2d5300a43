use async_trait::async_trait;

use crate::{BlobResult, StoreEntry, StoredBlob};

/// Read-side primitives the gateway needs from an external blob store.
///
/// Implementations are shared across requests behind an `Arc` and must not
/// cache blob bytes or metadata themselves.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Every key under `prefix`, in the store's own enumeration order.
    async fn list(&self, prefix: &str) -> BlobResult<Vec<StoreEntry>>;

    /// Body and metadata in a single round trip.
    ///
    /// Returns `BlobError::NotFound` when the key does not exist.
    async fn get_with_metadata(&self, key: &str) -> BlobResult<StoredBlob>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
