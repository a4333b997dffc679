//! Normalization of an inbound request into a capture record.
//!
//! # Responsibilities
//! - Resolve client identity (IP, reverse DNS, scheme, location)
//! - Filter headers into the echoed map (lower-cased, platform prefixes dropped)
//! - Decompose the body by declared shape: multipart, URL-encoded form, opaque
//!
//! # Design Decisions
//! - Reverse DNS is best-effort and bounded by a timeout; failure leaves the
//!   field empty, never fails the request
//! - Platform/forwarding headers (`cf-*`, `x-*`) are consulted for identity
//!   resolution but excluded from the echoed header map
//! - A mid-stream multipart failure keeps everything captured so far and
//!   records the first error (partial capture, not an aborted request)

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;
use std::time::Duration;

use axum::http::HeaderMap;
use bytes::Bytes;
use regex::Regex;

use crate::cache::BlobStore;
use crate::capture::body::classify;
use crate::capture::record::BodyRepr;

/// City suffix of a `cf-ray` header value, e.g. "7f2…-SYD".
static CF_RAY_CITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(-[A-Z]+)$").unwrap());

const MULTIPART_FORM: &str = "multipart/form-data";
const URLENCODED_FORM: &str = "application/x-www-form-urlencoded";
/// The single-file upload convention: this part becomes the record's main body.
const FILE_PART: &str = "file";

/// Who sent the request, as far as we can tell.
#[derive(Debug, Default)]
pub struct Identity {
    pub ip: String,
    pub dns: String,
    pub proto: String,
    pub location: String,
}

/// Resolve the client identity from forwarded headers, the socket address,
/// and a bounded reverse-DNS lookup.
pub async fn resolve_identity(
    headers: &HeaderMap,
    remote: SocketAddr,
    tls: bool,
    dns_timeout: Duration,
) -> Identity {
    let mut ip = header(headers, "cf-connecting-ip").to_string();
    if ip.is_empty() {
        ip = header(headers, "x-forwarded-for").to_string();
    }
    if ip.is_empty() {
        ip = remote.ip().to_string();
    }

    let dns = reverse_dns(&ip, dns_timeout).await;

    let mut proto = header(headers, "x-forwarded-proto").to_string();
    if proto.is_empty() {
        proto = if tls { "https" } else { "http" }.to_string();
    }

    let mut location = header(headers, "cf-ipcountry").to_string();
    if let Some(m) = CF_RAY_CITY.captures(header(headers, "cf-ray")) {
        location.push_str(&m[1]);
    }

    Identity {
        ip,
        dns,
        proto,
        location,
    }
}

/// Copy headers into the echoed map with lower-cased names, dropping the
/// platform/forwarding prefixes.
pub fn filter_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();

    for name in headers.keys() {
        let key = name.as_str(); // http header names are already lower-case
        if key.starts_with("cf-") || key.starts_with("x-") {
            tracing::debug!(header = key, "Skipping platform header");
            continue;
        }
        map.insert(key.to_string(), header(headers, key).to_string());
    }

    map
}

/// Outcome of decomposing one request body.
#[derive(Debug, Default)]
pub struct BodyCapture {
    pub body: Option<BodyRepr>,
    pub form: Option<BTreeMap<String, BodyRepr>>,
    pub error: Option<String>,
}

/// Decompose an already-buffered body according to its declared content type
/// and classify each piece.
pub async fn capture_body(store: &BlobStore, content_type: &str, bytes: Bytes) -> BodyCapture {
    if content_type.starts_with(MULTIPART_FORM) {
        if let Ok(boundary) = multer::parse_boundary(content_type) {
            return capture_multipart(store, boundary, bytes).await;
        }
        // Fall through: an unparseable boundary is treated as an opaque body.
    }

    if content_type.starts_with(URLENCODED_FORM) {
        return capture_form(bytes);
    }

    let mut capture = BodyCapture::default();
    if !bytes.is_empty() {
        capture.body = Some(classify(store, bytes, content_type, ""));
    }
    capture
}

/// Iterate multipart parts in arrival order. The part named `file` becomes
/// the main body; every other part lands in the form map under its field
/// name. The first part error stops iteration but keeps prior captures.
async fn capture_multipart(store: &BlobStore, boundary: String, bytes: Bytes) -> BodyCapture {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut capture = BodyCapture::default();
    let mut form = BTreeMap::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                let filename = field.file_name().unwrap_or_default().to_string();
                let part_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_default();

                match field.bytes().await {
                    Ok(data) => {
                        let repr = classify(store, data, &part_type, &filename);
                        if name == FILE_PART {
                            capture.body = Some(repr);
                        } else {
                            form.insert(name, repr);
                        }
                    }
                    Err(e) => {
                        capture.error = Some(format!("Download failed: {e}"));
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                capture.error = Some(format!("Download failed: {e}"));
                break;
            }
        }
    }

    if !form.is_empty() {
        capture.form = Some(form);
    }
    capture
}

/// URL-encoded forms carry no files: every field is an inline string.
fn capture_form(bytes: Bytes) -> BodyCapture {
    let mut form = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(&bytes) {
        form.insert(key.into_owned(), BodyRepr::Inline(value.into_owned()));
    }

    BodyCapture {
        body: None,
        form: (!form.is_empty()).then_some(form),
        error: None,
    }
}

/// Best-effort reverse lookup, bounded so a slow resolver cannot stall the
/// request it belongs to. Resolution runs on the blocking pool; no shared
/// lock is held while it is in flight.
async fn reverse_dns(ip: &str, bound: Duration) -> String {
    let Ok(addr) = ip.parse::<IpAddr>() else {
        return String::new();
    };
    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr));
    match tokio::time::timeout(bound, lookup).await {
        Ok(Ok(Ok(name))) => name,
        _ => String::new(),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store() -> BlobStore {
        BlobStore::new(1024 * 1024)
    }

    #[tokio::test]
    async fn identity_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.9"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("cf-ipcountry", HeaderValue::from_static("AU"));
        headers.insert("cf-ray", HeaderValue::from_static("7f2abc-SYD"));

        let remote: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let id = resolve_identity(&headers, remote, false, Duration::from_millis(10)).await;

        assert_eq!(id.ip, "203.0.113.9");
        assert_eq!(id.proto, "https");
        assert_eq!(id.location, "AU-SYD");
    }

    #[tokio::test]
    async fn identity_falls_back_to_the_socket() {
        let headers = HeaderMap::new();
        let remote: SocketAddr = "192.0.2.7:1234".parse().unwrap();

        let id = resolve_identity(&headers, remote, true, Duration::from_millis(10)).await;
        assert_eq!(id.ip, "192.0.2.7");
        assert_eq!(id.proto, "https");
        assert_eq!(id.location, "");
    }

    #[test]
    fn platform_headers_are_filtered_out() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("*/*"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("cf-ray", HeaderValue::from_static("abc"));
        headers.insert("content-length", HeaderValue::from_static("42"));

        let map = filter_headers(&headers);
        assert!(map.contains_key("accept"));
        assert!(map.contains_key("content-length"));
        assert!(!map.contains_key("x-forwarded-for"));
        assert!(!map.contains_key("cf-ray"));
    }

    #[tokio::test]
    async fn opaque_text_body_is_inlined() {
        let s = store();
        let capture = capture_body(&s, "text/plain", Bytes::from_static(b"hi")).await;
        assert_eq!(capture.body, Some(BodyRepr::Inline("hi".into())));
        assert!(capture.form.is_none());
        assert!(capture.error.is_none());
    }

    #[tokio::test]
    async fn empty_body_yields_no_representation() {
        let s = store();
        let capture = capture_body(&s, "text/plain", Bytes::new()).await;
        assert!(capture.body.is_none());
        assert!(capture.error.is_none());
    }

    #[tokio::test]
    async fn urlencoded_fields_are_inline_strings() {
        let s = store();
        let capture = capture_body(
            &s,
            URLENCODED_FORM,
            Bytes::from_static(b"name=alice&note=hi%20there"),
        )
        .await;

        let form = capture.form.unwrap();
        assert_eq!(form["name"], BodyRepr::Inline("alice".into()));
        assert_eq!(form["note"], BodyRepr::Inline("hi there".into()));
        assert!(capture.body.is_none());
    }

    #[tokio::test]
    async fn multipart_file_part_becomes_the_main_body() {
        let s = store();
        let mut raw = Vec::new();
        raw.extend_from_slice(
            b"--XBOUND\r\n\
              Content-Disposition: form-data; name=\"file\"; filename=\"pic.png\"\r\n\
              Content-Type: image/png\r\n\r\n",
        );
        // An invalid-UTF-8 payload so the part classifies as binary.
        raw.extend_from_slice(&[0x89, 0x50, 0x4e, 0x47, 0x80]);
        raw.extend_from_slice(
            b"\r\n--XBOUND\r\n\
              Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
              a cat\r\n\
              --XBOUND--\r\n",
        );

        let capture = capture_body(
            &s,
            "multipart/form-data; boundary=XBOUND",
            Bytes::from(raw),
        )
        .await;

        match capture.body {
            Some(BodyRepr::Blob(blob)) => {
                assert_eq!(blob.mime_type, "image/png");
                assert!(s.get(&blob.hash).is_some());
            }
            other => panic!("expected blob body, got {other:?}"),
        }
        let form = capture.form.unwrap();
        assert_eq!(form["comment"], BodyRepr::Inline("a cat".into()));
        assert!(capture.error.is_none());
    }

    #[tokio::test]
    async fn truncated_multipart_keeps_partial_capture() {
        let s = store();
        let body = concat!(
            "--XBOUND\r\n",
            "Content-Disposition: form-data; name=\"first\"\r\n",
            "\r\n",
            "ok\r\n",
            "--XBOUND\r\n",
            "Content-Disposition: form-data; name=\"second\"\r\n",
            "\r\n",
            "never terminated"
        );

        let capture = capture_body(
            &s,
            "multipart/form-data; boundary=XBOUND",
            Bytes::from_static(body.as_bytes()),
        )
        .await;

        assert!(capture.error.is_some());
        let form = capture.form.unwrap();
        assert_eq!(form["first"], BodyRepr::Inline("ok".into()));
    }
}
