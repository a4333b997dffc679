//! The catch-all echo handler.
//!
//! # Responsibilities
//! - Fixed paths (`/ping`) and CORS reflection
//! - Echo/stats introspection short-circuit
//! - Blob retrieval under `/file/{hash}`
//! - Driving the capture pipeline and path directives for everything else
//!
//! # Design Decisions
//! - Dispatch is sequential pattern matching in a fixed priority order:
//!   fixed paths → echo/stats → file serving → capture + directive scan
//! - The introspection request itself is never appended to history
//! - Neither shared lock is held across the body read, the DNS lookup, or
//!   an injected delay

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::capture::pipeline;
use crate::capture::record::CapturedRequest;
use crate::http::directives;
use crate::http::server::AppState;
use crate::observability::metrics;

const JSON_TYPE: &str = "application/json; charset=utf8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Handle any method on any path.
pub async fn echo(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();

    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let raw_path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let host = header_str(&parts.headers, "host").to_string();

    if path == "/ping" {
        return "pong".into_response();
    }

    let cors = cors_headers(&parts.headers, &host);

    // Introspection short-circuits the capture pipeline entirely; the
    // request asking for a record is itself never stored.
    if let Some(index) = directives::echo_index(&path) {
        let json = match index.and_then(|i| state.history.at(i)) {
            Some(record) => pretty_json(record.as_ref()),
            None => pretty_json(&state.history.snapshot()),
        };
        return json_response(StatusCode::OK, cors, json);
    }

    // Blob retrieval goes straight to the cache, no capture.
    if let Some(hash) = directives::file_hash(&path) {
        return serve_blob(&state, hash);
    }

    let mut record = CapturedRequest::begin(method.clone(), host, raw_path);

    let identity = pipeline::resolve_identity(
        &parts.headers,
        remote,
        state.tls,
        state.capture.dns_timeout(),
    )
    .await;
    record.ip = identity.ip;
    record.dns = identity.dns;
    record.proto = identity.proto;
    record.location = identity.location;

    record.headers = pipeline::filter_headers(&parts.headers);

    let content_type = header_str(&parts.headers, "content-type").to_string();
    match to_bytes(body, state.capture.max_body_bytes).await {
        Ok(bytes) => {
            let captured = pipeline::capture_body(&state.cache, &content_type, bytes).await;
            record.body = captured.body;
            record.form = captured.form;
            record.error = captured.error;
        }
        // A disconnect or over-limit read is data on the record, not a 5xx.
        Err(e) => record.error = Some(format!("Download failed: {e}")),
    }

    if let Some(duration) = directives::delay(&path) {
        record.sleep = Some(format!("{duration:?}"));
        tokio::time::sleep(duration).await;
    }

    let mut status = StatusCode::OK;
    if let Some(code) = directives::status_override(&path) {
        if let Ok(parsed) = StatusCode::from_u16(code) {
            record.status = Some(code);
            status = parsed;
        }
    }

    record.duration = format!("{:?}", started.elapsed());

    let record = Arc::new(record);
    let index = state.history.append(Arc::clone(&record));
    metrics::record_request(&method, status.as_u16(), started);
    tracing::debug!(index, method = %record.method, path = %record.path, "Captured request");

    json_response(status, cors, pretty_json(record.as_ref()))
}

fn serve_blob(state: &AppState, hash: &str) -> Response {
    let Some(entry) = state.cache.get(hash) else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let mime_type = if entry.mime_type.is_empty() {
        OCTET_STREAM
    } else {
        &entry.mime_type
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(entry.bytes.len()));

    (StatusCode::OK, headers, entry.bytes).into_response()
}

/// Reflect the caller's origin when it differs from the request host.
fn cors_headers(headers: &HeaderMap, host: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Some(origin) = headers.get(header::ORIGIN) {
        if matches!(origin.to_str().map(|o| !o.is_empty() && o != host), Ok(true)) {
            map.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            map.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("*"),
            );
            map.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("*"),
            );
        }
    }
    map
}

fn json_response(status: StatusCode, extra_headers: HeaderMap, body: String) -> Response {
    let mut headers = extra_headers;
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_TYPE));
    (status, headers, body).into_response()
}

fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
