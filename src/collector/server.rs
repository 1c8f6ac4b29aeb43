//! HTTP receiver for the log collector.
//!
//! An Axum server with four routes: ingest (`POST /debug`), health
//! (`GET /health`), retrieval (`GET /logs`) and reset (`POST /clear`).
//! Every response carries permissive cross-origin headers since the
//! instrumented caller is often a browser-embedded application.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tower_http::cors::CorsLayer;

use super::CollectorConfig;
use super::entry::LogEntry;
use super::store::LogStore;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: LogStore,
    port: u16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    log_count: u64,
    port: u16,
}

/// Run the collector server in the foreground until a termination signal.
///
/// Opening the store truncates any previous log file; a storage error here
/// is fatal since the collector must not serve without persistence.
pub async fn run_server(config: &CollectorConfig) -> Result<(), String> {
    let store = LogStore::open(&config.log_file)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

    serve_with_listener(listener, store).await
}

/// Serve requests on a pre-bound listener. Split out from [`run_server`] so
/// tests can drive a real server on an ephemeral port.
pub async fn serve_with_listener(listener: TcpListener, store: LogStore) -> Result<(), String> {
    let port = listener
        .local_addr()
        .map_err(|e| format!("Failed to get listener address: {e}"))?
        .port();

    info!(port, path = %store.path().display(), "Collector listening");
    println!(
        "probelog collecting on http://127.0.0.1:{port} -> {}",
        store.path().display()
    );

    let state = AppState {
        store: store.clone(),
        port,
    };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {e}"))?;

    let final_count = store.count().unwrap_or(0);
    println!("probelog stopped after {final_count} entries");
    Ok(())
}

/// Build the collector router.
///
/// The preflight-status layer sits outside the CORS layer so it sees the
/// CORS layer's own OPTIONS responses.
fn router(state: AppState) -> Router {
    Router::new()
        .route("/debug", post(ingest))
        .route("/health", get(health))
        .route("/logs", get(get_logs))
        .route("/clear", post(clear))
        .fallback(fallback)
        .method_not_allowed_fallback(fallback)
        .layer(CorsLayer::permissive())
        .layer(map_response(preflight_status))
        .with_state(state)
}

/// Handle one inbound log event.
///
/// The body must be a syntactically valid JSON object; anything else is
/// rejected with 400 and surfaced on the operator console, never echoed back
/// to the caller. Callers treat this endpoint as fire-and-forget.
async fn ingest(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let entry: LogEntry = match serde_json::from_slice(&body) {
        Ok(entry) => entry,
        Err(e) => {
            error!("Rejected malformed log payload: {e}");
            return (StatusCode::BAD_REQUEST, "invalid JSON");
        }
    };

    match state.store.append(entry) {
        Ok((seq, entry)) => {
            println!("{}", echo_line(seq, &entry));
            (StatusCode::OK, "ok")
        }
        Err(e) => {
            error!("Failed to persist log entry: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "storage error")
        }
    }
}

/// Health check: current status, entry count and listening port.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let log_count = state.store.count().unwrap_or(0);
    axum::Json(HealthResponse {
        status: "ok",
        log_count,
        port: state.port,
    })
}

/// Return the raw NDJSON log collected since the last start/clear.
async fn get_logs(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.read_all() {
        Ok(contents) => (StatusCode::OK, contents),
        Err(e) => {
            error!("Failed to read log file: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

/// Truncate the log and reset the entry counter.
async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.clear() {
        Ok(()) => {
            println!("probelog log cleared");
            (StatusCode::OK, "cleared")
        }
        Err(e) => {
            error!("Failed to clear log file: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "storage error")
        }
    }
}

/// Unmatched route or method. OPTIONS never reaches the router; the CORS
/// layer answers it first, so everything arriving here is a 404.
async fn fallback(method: Method, uri: Uri) -> StatusCode {
    debug!(%method, %uri, "Unknown route");
    StatusCode::NOT_FOUND
}

/// The CORS layer answers every OPTIONS request itself with a 200 and no
/// body, without touching the store. Callers are promised an empty 204 on
/// any path, so rewrite the status here, leaving the permissive headers
/// intact.
async fn preflight_status(method: Method, mut response: Response) -> Response {
    if method == Method::OPTIONS && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// One-line operator transcript for an accepted entry: sequence number,
/// hypothesis tag when present, location, message.
fn echo_line(seq: u64, entry: &LogEntry) -> String {
    let mut line = format!("[{seq}]");
    if let Some(hypothesis) = &entry.hypothesis_id {
        line.push_str(&format!(" [{hypothesis}]"));
    }
    if let Some(location) = &entry.location {
        line.push_str(&format!(" {location}"));
    }
    if let Some(message) = &entry.message {
        line.push_str(&format!(" {message}"));
    }
    line
}

/// Resolve on SIGINT or SIGTERM, letting axum drain in-flight requests.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Termination signal received, draining in-flight requests");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(json: &str) -> LogEntry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn echo_line_includes_hypothesis_and_location() {
        let entry = entry(r#"{"location":"a.js:1","message":"x","hypothesisId":"H2"}"#);
        assert_eq!(echo_line(3, &entry), "[3] [H2] a.js:1 x");
    }

    #[test]
    fn echo_line_omits_absent_fields() {
        let entry = entry(r#"{"message":"just a message"}"#);
        assert_eq!(echo_line(1, &entry), "[1] just a message");
    }
}
