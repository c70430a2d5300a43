//! Content-type detection from leading bytes, then from the key's extension.

use bytes::Bytes;
use futures_util::StreamExt;

use crate::ByteStream;

/// Bytes inspected by [`sniff`].
pub const SNIFF_LEN: usize = 16;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Never fails; falls back to `application/octet-stream`.
pub fn sniff(prefix: &[u8], key: &str) -> &'static str {
    from_signature(prefix)
        .or_else(|| from_extension(key))
        .unwrap_or(OCTET_STREAM)
}

pub fn from_signature(prefix: &[u8]) -> Option<&'static str> {
    let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];
    if prefix.starts_with(&[0xFF, 0xD8]) {
        return Some("image/jpeg");
    }
    if prefix.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    let head = &prefix[..prefix.len().min(12)];
    if head.windows(4).any(|w| w == b"WEBP") {
        return Some("image/webp");
    }
    None
}

pub fn from_extension(key: &str) -> Option<&'static str> {
    let filename = crate::keys::derive_filename(key);
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Read just enough of `stream` to get `want` bytes (or all of it, if shorter).
///
/// Returns those bytes and a stream that yields the whole payload from the
/// start. Only the chunks needed to cover the prefix are held in memory.
pub async fn peek_prefix(
    mut stream: ByteStream,
    want: usize,
) -> std::io::Result<(Vec<u8>, ByteStream)> {
    let mut buffered: Vec<Bytes> = Vec::new();
    let mut seen = 0usize;

    while seen < want {
        match stream.next().await {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => {
                seen += chunk.len();
                buffered.push(chunk);
            }
            Some(Err(err)) => return Err(err),
            None => break,
        }
    }

    let mut prefix = Vec::with_capacity(want.min(seen));
    for chunk in &buffered {
        let take = (want - prefix.len()).min(chunk.len());
        prefix.extend_from_slice(&chunk[..take]);
        if prefix.len() == want {
            break;
        }
    }

    let replay = futures::stream::iter(buffered.into_iter().map(Ok));
    Ok((prefix, Box::pin(replay.chain(stream))))
}
