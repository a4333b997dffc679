//! End-to-end tests for the echo capture flow.

use std::time::{Duration, Instant};

use echo_server::EchoConfig;
use serde_json::Value;

mod common;

#[tokio::test]
async fn capture_reflects_request_shape() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("http://{addr}/some/path?q=1"))
        .header("echo-test", "yes")
        .header("x-secret", "hidden")
        .body("hello")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/some/path?q=1");
    assert_eq!(body["body"], "hello");
    assert_eq!(body["headers"]["echo-test"], "yes");
    assert!(body["headers"].get("x-secret").is_none());
    assert_eq!(body["ip"], "127.0.0.1");
    assert!(body["time"].is_string());
    assert!(body["duration"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn binary_body_is_cached_and_served_back() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();
    let payload = vec![0xff, 0xfe, 0x00, 0x80, 0x81];

    let body: Value = client
        .post(format!("http://{addr}/upload"))
        .header("content-type", "application/octet-stream")
        .body(payload.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let blob = &body["body"];
    assert_eq!(blob["length"], payload.len());
    assert_eq!(blob["type"], "application/octet-stream");
    let hash = blob["hash"].as_str().unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(blob["url"], format!("/file/{hash}"));

    let fetched = client
        .get(format!("http://{addr}/file/{hash}"))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
    assert_eq!(
        fetched.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(fetched.bytes().await.unwrap().as_ref(), &payload[..]);
}

#[tokio::test]
async fn unknown_hash_is_a_plain_404() {
    let addr = common::spawn_default_server().await;

    let resp = reqwest::get(format!("http://{addr}/file/{}", "a".repeat(64)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "File not found");
}

#[tokio::test]
async fn echo_serves_stats_and_history() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();

    // Introspection requests are never themselves stored.
    let stats: Value = client
        .get(format!("http://{addr}/echo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["echoes"], 0);

    client
        .get(format!("http://{addr}/first"))
        .send()
        .await
        .unwrap();
    client
        .get(format!("http://{addr}/second"))
        .send()
        .await
        .unwrap();

    let stats: Value = client
        .get(format!("http://{addr}/echoes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["echoes"], 2);
    assert!(stats["uptime"].is_string());

    let first: Value = client
        .get(format!("http://{addr}/echo/0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["path"], "/first");

    let second: Value = client
        .get(format!("http://{addr}/echoes/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["path"], "/second");

    // Out-of-range indices fall back to the stats snapshot.
    let fallback: Value = client
        .get(format!("http://{addr}/echo/99"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fallback["echoes"], 2);
}

#[tokio::test]
async fn delay_directive_suspends_the_response() {
    let addr = common::spawn_default_server().await;

    let started = Instant::now();
    let body: Value = reqwest::get(format!("http://{addr}/delay/250"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(body["sleep"], "250ms");
}

#[tokio::test]
async fn delay_of_a_minute_or_more_is_ignored() {
    let addr = common::spawn_default_server().await;

    let body: Value = reqwest::get(format!("http://{addr}/sleep/100s"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.get("sleep").is_none());
}

#[tokio::test]
async fn status_directive_overrides_the_response_code() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("http://{addr}/status/418"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 418);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 418);
    assert_eq!(body["method"], "DELETE");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn multipart_file_upload_lands_in_the_cache() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();
    let payload = vec![0x89, 0x50, 0x4e, 0x47, 0x80, 0x00];

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(payload.clone())
                .file_name("pic.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .text("comment", "a cat");

    let body: Value = client
        .post(format!("http://{addr}/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let blob = &body["body"];
    assert_eq!(blob["type"], "image/png");
    assert_eq!(blob["length"], payload.len());
    assert_eq!(body["form"]["comment"], "a cat");

    let url = blob["url"].as_str().unwrap();
    let fetched = reqwest::get(format!("http://{addr}{url}")).await.unwrap();
    assert_eq!(fetched.status(), 200);
    assert_eq!(fetched.bytes().await.unwrap().as_ref(), &payload[..]);
}

#[tokio::test]
async fn urlencoded_form_fields_are_reflected_inline() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("http://{addr}/form"))
        .form(&[("name", "alice"), ("note", "hi there")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["form"]["name"], "alice");
    assert_eq!(body["form"]["note"], "hi there");
    assert!(body.get("body").is_none());
}

#[tokio::test]
async fn ping_answers_pong_without_capture() {
    let addr = common::spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = reqwest::get(format!("http://{addr}/ping")).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "pong");

    let stats: Value = client
        .get(format!("http://{addr}/echo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["echoes"], 0);
}

#[tokio::test]
async fn identical_uploads_share_one_cache_entry() {
    let mut config = EchoConfig::default();
    config.cache.capacity_bytes = 1024;
    let addr = common::spawn_server(config).await;
    let client = reqwest::Client::new();
    let payload = vec![0xde, 0xad, 0xbe, 0xef];

    let mut hashes = Vec::new();
    for _ in 0..2 {
        let body: Value = client
            .post(format!("http://{addr}/upload"))
            .header("content-type", "application/octet-stream")
            .body(payload.clone())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        hashes.push(body["body"]["hash"].as_str().unwrap().to_string());
    }

    assert_eq!(hashes[0], hashes[1]);
}
