//! HTTP client for talking to a running collector.
//!
//! Used by the `status`, `logs` and `clear` subcommands.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::CLIENT_HOST;

const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Health endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub status: String,
    pub log_count: u64,
    pub port: u16,
}

fn build_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))
}

fn build_url(port: u16, path: &str) -> String {
    format!("http://{CLIENT_HOST}:{port}{path}")
}

/// Query the collector health endpoint.
pub async fn health(port: u16) -> Result<HealthSummary, String> {
    let client = build_client()?;
    let url = build_url(port, "/health");
    debug!(%url, "Sending collector health request");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("Health request failed: {e}"))?;

    if response.status() != StatusCode::OK {
        return Err(format!(
            "Health request failed with status {}",
            response.status()
        ));
    }

    response
        .json()
        .await
        .map_err(|e| format!("Failed to parse health response: {e}"))
}

/// Fetch the raw NDJSON log body.
pub async fn fetch_logs(port: u16) -> Result<String, String> {
    let client = build_client()?;
    let url = build_url(port, "/logs");
    debug!(%url, "Fetching collected log");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("Logs request failed: {e}"))?;

    if response.status() != StatusCode::OK {
        return Err(format!(
            "Logs request failed with status {}",
            response.status()
        ));
    }

    response
        .text()
        .await
        .map_err(|e| format!("Failed to read logs response: {e}"))
}

/// Ask the collector to truncate the log and reset its counter.
pub async fn clear(port: u16) -> Result<(), String> {
    let client = build_client()?;
    let url = build_url(port, "/clear");
    debug!(%url, "Sending collector clear request");

    let response = client
        .post(&url)
        .send()
        .await
        .map_err(|e| format!("Clear request failed: {e}"))?;

    if response.status() == StatusCode::OK {
        Ok(())
    } else {
        Err(format!(
            "Clear request failed with status {}",
            response.status()
        ))
    }
}
