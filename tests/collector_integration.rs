//! Integration tests driving a real collector server on an ephemeral port.

#![allow(clippy::unwrap_used)]

use probelog::collector::server;
use probelog::collector::store::LogStore;
use tempfile::TempDir;

/// Spawn a collector on an ephemeral port backed by a temp log file.
/// Returns the bound port and the temp dir keeping the log file alive.
async fn spawn_collector() -> (u16, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(&dir.path().join("debug.ndjson")).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let _ = server::serve_with_listener(listener, store).await;
    });

    (port, dir)
}

fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

#[tokio::test]
async fn ingest_assigns_metadata_and_appends_one_line() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    let before = chrono::Utc::now().timestamp_millis();
    let response = client
        .post(url(port, "/debug"))
        .body(r#"{"location":"a.js:1","message":"x","hypothesisId":"A"}"#)
        .send()
        .await
        .unwrap();
    let after = chrono::Utc::now().timestamp_millis();
    assert_eq!(response.status(), 200);

    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 1);

    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry["hypothesisId"], "A");
    assert_eq!(entry["location"], "a.js:1");
    assert_eq!(entry["message"], "x");
    assert!(!entry["id"].as_str().unwrap().is_empty());
    let server_ts = entry["serverTimestamp"].as_i64().unwrap();
    assert!(server_ts >= before && server_ts <= after);

    let health: serde_json::Value = client
        .get(url(port, "/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["logCount"], 1);
    assert_eq!(health["port"], u64::from(port));
}

#[tokio::test]
async fn caller_supplied_id_and_timestamp_survive() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    client
        .post(url(port, "/debug"))
        .body(r#"{"id":"custom-1","timestamp":1700000000000,"serverTimestamp":1,"message":"x"}"#)
        .send()
        .await
        .unwrap();

    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let entry: serde_json::Value = serde_json::from_str(body.lines().next().unwrap()).unwrap();
    assert_eq!(entry["id"], "custom-1");
    assert_eq!(entry["timestamp"], 1700000000000_i64);
    // serverTimestamp is never trusted from the caller.
    assert_ne!(entry["serverTimestamp"], 1);
}

#[tokio::test]
async fn malformed_body_is_rejected_without_side_effects() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(port, "/debug"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let health: serde_json::Value = client
        .get(url(port, "/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["logCount"], 0);

    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "");
}

#[tokio::test]
async fn clear_resets_log_and_counter() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        client
            .post(url(port, "/debug"))
            .body(r#"{"message":"entry"}"#)
            .send()
            .await
            .unwrap();
    }

    let response = client.post(url(port, "/clear")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "");

    let health: serde_json::Value = client
        .get(url(port, "/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["logCount"], 0);
}

#[tokio::test]
async fn clear_with_no_prior_ingests_is_ok() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    let response = client.post(url(port, "/clear")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingests_each_append_exactly_one_line() {
    let (port, _dir) = spawn_collector().await;

    const N: usize = 20;
    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        handles.push(tokio::spawn(async move {
            let client = reqwest::Client::new();
            let response = client
                .post(url(port, "/debug"))
                .body(format!(r#"{{"message":"entry {i}"}}"#))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let client = reqwest::Client::new();
    let body = client
        .get(url(port, "/logs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), N);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.is_object());
    }

    let health: serde_json::Value = client
        .get(url(port, "/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["logCount"], u64::try_from(N).unwrap());
}

#[tokio::test]
async fn options_anywhere_returns_204_with_cors() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    for path in ["/debug", "/logs", "/anything"] {
        let response = client
            .request(reqwest::Method::OPTIONS, url(port, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204, "OPTIONS {path}");
        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .unwrap_or_else(|| panic!("missing CORS header on OPTIONS {path}"));
        assert_eq!(allow_origin, "*");
    }
}

#[tokio::test]
async fn browser_preflight_returns_204_with_empty_body() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    // A real browser preflight carries Origin and the requested method.
    let response = client
        .request(reqwest::Method::OPTIONS, url(port, "/debug"))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn regular_responses_carry_cors_headers() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    let response = client.get(url(port, "/health")).send().await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn unknown_routes_and_methods_return_404() {
    let (port, _dir) = spawn_collector().await;
    let client = reqwest::Client::new();

    let response = client.get(url(port, "/nope")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // Wrong method on a known path is also a not-found per the contract.
    let response = client.post(url(port, "/health")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}
