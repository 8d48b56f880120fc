//! Shared HTTP plumbing for the Q&A and wiki clients.
//!
//! One `reqwest::Client` is built per run with the configured timeout and,
//! when `cert_path` is set, an extra PEM root certificate for internal
//! endpoints signed by a private CA. [`get_json`] sends a prepared request and
//! maps every failure mode onto [`IngestError`].

use crate::config::IngestConfig;
use crate::error::IngestError;
use reqwest::{Certificate, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Longest error body echoed back in [`IngestError::HttpStatus`].
const MAX_ERROR_BODY: usize = 200;

/// Build the HTTP client for a run.
pub fn build_client(config: &IngestConfig) -> Result<Client, IngestError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("kb-ingest/", env!("CARGO_PKG_VERSION")));

    if let Some(path) = &config.cert_path {
        builder = builder.add_root_certificate(load_certificate(path)?);
    }

    builder
        .build()
        .map_err(|e| IngestError::HttpClient(e.to_string()))
}

fn load_certificate(path: &Path) -> Result<Certificate, IngestError> {
    let pem = std::fs::read(path).map_err(|e| IngestError::CertificateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Certificate::from_pem(&pem).map_err(|e| IngestError::CertificateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Send `request` and decode a JSON body.
///
/// `url` is only used for error messages and logs; pass it without query
/// parameters so API keys never end up in output.
pub async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
    timeout_secs: u64,
) -> Result<T, IngestError> {
    debug!("GET {}", url);

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            IngestError::RequestTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            IngestError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| IngestError::RequestFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(IngestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    decode(url, &body)
}

/// Decode a JSON payload, reporting shape mismatches as [`IngestError::InvalidResponse`].
pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, IngestError> {
    serde_json::from_str(body).map_err(|e| IngestError::InvalidResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
