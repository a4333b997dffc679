//! Body classification: inline UTF-8 text vs. out-of-line blob reference.

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::cache::BlobStore;
use crate::capture::record::{BlobRef, BodyRepr};
use crate::http::mime;

const OCTET_STREAM: &str = "application/octet-stream";

/// Decide how to represent a payload.
///
/// Valid UTF-8 is inlined as text, exactly as received; everything else is
/// registered with the blob store under its content hash and represented as
/// a reference. An empty payload is an empty inline string, not an error.
///
/// Declared size headers are never consulted here; the caller bounds the
/// total read.
pub fn classify(
    store: &BlobStore,
    bytes: Bytes,
    declared_mime: &str,
    filename_hint: &str,
) -> BodyRepr {
    if bytes.is_empty() {
        return BodyRepr::Inline(String::new());
    }

    match std::str::from_utf8(&bytes) {
        Ok(text) => BodyRepr::Inline(text.to_string()),
        Err(_) => {
            let mime_type = effective_mime(declared_mime, filename_hint);
            let hash = content_hash(&mime_type, &bytes);
            let length = bytes.len();
            store.put(&hash, filename_hint, &mime_type, bytes);
            BodyRepr::Blob(BlobRef::new(length, mime_type, hash))
        }
    }
}

/// Hex digest over `mimeType + "|" + bytes`, the cache key and public
/// retrieval identifier.
pub fn content_hash(mime_type: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mime_type.as_bytes());
    hasher.update(b"|");
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Resolve the MIME type a blob is stored under. The declared type wins
/// unless it is missing or the generic default, in which case the filename
/// extension decides.
fn effective_mime(declared: &str, filename_hint: &str) -> String {
    if !declared.is_empty() && declared != OCTET_STREAM {
        return declared.to_string();
    }
    mime::by_extension(filename_hint)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}
