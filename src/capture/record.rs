//! The capture record: one normalized, serializable request fingerprint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a request body (or one form field of it) is represented.
///
/// Valid UTF-8 payloads are carried inline; anything else is stored in the
/// blob cache and referenced by content hash. The split is one-way: once a
/// body is stored as a reference, the record keeps only the reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyRepr {
    /// The body bytes, decoded as UTF-8 text.
    Inline(String),
    /// An out-of-line reference into the blob cache.
    Blob(BlobRef),
}

/// Reference to a cached binary payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobRef {
    /// Payload length in bytes.
    pub length: usize,
    /// Effective MIME type the payload was stored under.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Hex content hash, also the cache key.
    pub hash: String,
    /// Retrieval path, `/file/{hash}`.
    pub url: String,
}

impl BlobRef {
    pub fn new(length: usize, mime_type: String, hash: String) -> Self {
        let url = format!("/file/{hash}");
        Self {
            length,
            mime_type,
            hash,
            url,
        }
    }
}

/// Everything captured about one inbound request.
///
/// Built mutably while the handler runs, then frozen and handed to the
/// history ledger.
#[derive(Debug, Serialize)]
pub struct CapturedRequest {
    /// When capture started.
    pub time: DateTime<Utc>,
    /// Wall time from capture start to finalize, humanized.
    pub duration: String,
    /// Country/city hint from platform headers, best-effort.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    /// Client IP, preferring trusted forwarded headers over the socket.
    pub ip: String,
    /// Reverse-DNS name for the client IP, empty when resolution failed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns: String,
    /// "http" or "https" (or whatever a forwarded-proto header claimed).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proto: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
    /// Raw path plus query string.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Lower-cased, filtered header map.
    pub headers: BTreeMap<String, String>,
    /// Main body representation, absent for empty bodies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyRepr>,
    /// Per-field bodies for form and multipart requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<BTreeMap<String, BodyRepr>>,
    /// First capture error encountered, surfaced as data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Injected delay that was honored, humanized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,
    /// Status code override from a path directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl CapturedRequest {
    /// Start a record for a request arriving now.
    pub fn begin(method: String, host: String, path: String) -> Self {
        Self {
            time: Utc::now(),
            duration: String::new(),
            location: String::new(),
            ip: String::new(),
            dns: String::new(),
            proto: String::new(),
            host,
            method,
            path,
            headers: BTreeMap::new(),
            body: None,
            form: None,
            error: None,
            sleep: None,
            status: None,
        }
    }
}
