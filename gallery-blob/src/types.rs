use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Async reader over blob content
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// The shapes a store may hand back a blob body in.
///
/// `into_stream` is the single place these shapes are reconciled; nothing
/// else in the crate inspects which variant it holds.
pub enum BlobBody {
    /// Already in memory, reference-counted
    Bytes(Bytes),
    /// Already in memory, owned
    Buffer(Vec<u8>),
    /// Chunked stream (e.g. an HTTP response body)
    Stream(ByteStream),
    /// Async reader (e.g. an SDK body adapter)
    Reader(ByteReader),
}

impl BlobBody {
    pub fn into_stream(self) -> ByteStream {
        match self {
            BlobBody::Bytes(bytes) => once(bytes),
            BlobBody::Buffer(buf) => once(Bytes::from(buf)),
            BlobBody::Stream(stream) => stream,
            BlobBody::Reader(reader) => Box::pin(ReaderStream::new(reader)),
        }
    }

    /// Length when the body is already in memory.
    pub fn known_len(&self) -> Option<u64> {
        match self {
            BlobBody::Bytes(bytes) => Some(bytes.len() as u64),
            BlobBody::Buffer(buf) => Some(buf.len() as u64),
            BlobBody::Stream(_) | BlobBody::Reader(_) => None,
        }
    }
}

fn once(bytes: Bytes) -> ByteStream {
    if bytes.is_empty() {
        Box::pin(futures::stream::empty())
    } else {
        Box::pin(futures::stream::once(async move { Ok(bytes) }))
    }
}

impl std::fmt::Debug for BlobBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobBody::Bytes(b) => write!(f, "BlobBody::Bytes({} bytes)", b.len()),
            BlobBody::Buffer(b) => write!(f, "BlobBody::Buffer({} bytes)", b.len()),
            BlobBody::Stream(_) => f.write_str("BlobBody::Stream"),
            BlobBody::Reader(_) => f.write_str("BlobBody::Reader"),
        }
    }
}

impl From<Bytes> for BlobBody {
    fn from(bytes: Bytes) -> Self {
        BlobBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for BlobBody {
    fn from(buf: Vec<u8>) -> Self {
        BlobBody::Buffer(buf)
    }
}

/// One entry of a prefix listing, as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub etag: String,
}

impl StoreEntry {
    pub fn new<K: Into<String>, E: Into<String>>(key: K, etag: E) -> Self {
        Self {
            key: key.into(),
            etag: etag.into(),
        }
    }
}

/// Body and metadata fetched in one store round trip.
///
/// Only lives for the duration of a single request.
#[derive(Debug)]
pub struct StoredBlob {
    pub body: BlobBody,
    /// `contentType` recorded at upload time, if any
    pub content_type: Option<String>,
    pub size_hint: Option<u64>,
}

impl StoredBlob {
    pub fn new(body: BlobBody) -> Self {
        let size_hint = body.known_len();
        Self {
            body,
            content_type: None,
            size_hint,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        let ct = content_type.into();
        let ct = ct.trim();
        self.content_type = if ct.is_empty() { None } else { Some(ct.to_string()) };
        self
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn collect(body: BlobBody) -> Vec<u8> {
        let chunks: Vec<Bytes> = body.into_stream().try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn every_shape_yields_the_same_bytes() {
        let data = b"hello blob".to_vec();

        assert_eq!(collect(BlobBody::Bytes(Bytes::from(data.clone()))).await, data);
        assert_eq!(collect(BlobBody::Buffer(data.clone())).await, data);

        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"blob"))];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        assert_eq!(collect(BlobBody::Stream(stream)).await, data);

        let reader: ByteReader = Box::pin(std::io::Cursor::new(data.clone()));
        assert_eq!(collect(BlobBody::Reader(reader)).await, data);
    }

    #[tokio::test]
    async fn empty_buffer_is_empty_stream() {
        assert!(collect(BlobBody::Buffer(Vec::new())).await.is_empty());
    }

    #[test]
    fn blank_content_type_is_absent() {
        let blob = StoredBlob::new(BlobBody::Buffer(vec![1, 2, 3])).with_content_type("  ");
        assert_eq!(blob.content_type, None);
        assert_eq!(blob.size_hint, Some(3));
    }
}
