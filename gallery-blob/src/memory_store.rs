use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{BlobBody, BlobError, BlobResult, BlobStore, StoreEntry, StoredBlob};

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Bytes,
    content_type: Option<String>,
    etag: String,
}

/// In-process store, enumerated in key order.
///
/// Used for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    version: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `key`, replacing any previous object.
    pub fn put(&self, key: impl Into<String>, bytes: impl Into<Bytes>, content_type: Option<&str>) {
        let bytes = bytes.into();
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let object = MemoryObject {
            etag: format!("\"{:x}-{:x}\"", bytes.len(), version),
            bytes,
            content_type: content_type.map(str::to_string),
        };
        self.objects.write().insert(key.into(), object);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> BlobResult<Vec<StoreEntry>> {
        let objects = self.objects.read();
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StoreEntry::new(key.clone(), object.etag.clone()))
            .collect())
    }

    async fn get_with_metadata(&self, key: &str) -> BlobResult<StoredBlob> {
        let object = self
            .objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::not_found(key))?;

        let mut blob = StoredBlob::new(BlobBody::Bytes(object.bytes));
        if let Some(ct) = object.content_type {
            blob = blob.with_content_type(ct);
        }
        Ok(blob)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_respects_prefix_boundaries() {
        let store = MemoryBlobStore::new();
        store.put("parties/2025/b.jpg", Bytes::from_static(b"b"), None);
        store.put("parties/2025/a.jpg", Bytes::from_static(b"a"), None);
        store.put("parties/2024/z.jpg", Bytes::from_static(b"z"), None);
        store.put("portraits/x.jpg", Bytes::from_static(b"x"), None);

        let keys: Vec<String> = store
            .list("parties/2025/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["parties/2025/a.jpg", "parties/2025/b.jpg"]);
        assert_eq!(store.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get_with_metadata("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn overwrite_changes_etag() {
        let store = MemoryBlobStore::new();
        store.put("a", Bytes::from_static(b"1"), None);
        let first = store.list("").await.unwrap()[0].etag.clone();
        store.put("a", Bytes::from_static(b"2"), None);
        let second = store.list("").await.unwrap()[0].etag.clone();
        assert_ne!(first, second);
    }
}
