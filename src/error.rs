//! Error types for the kb-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`]: **Fatal**: a source cannot be ingested at all
//!   (missing credentials, API unreachable, bad configuration). Returned as
//!   `Err(IngestError)` from the top-level `ingest*` / `run` functions.
//!
//! * [`RecordError`]: **Non-fatal**: a single record or wiki page failed
//!   (write error, page body unavailable) while the rest of the source is
//!   fine. Stored inside [`crate::ingest::SourceReport`] so a run reports
//!   partial success instead of losing every record to one bad file.
//!
//! The HTML-to-Markdown core has no error type at all: conversion is total
//! and degrades unsupported markup to omission.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the kb-ingest library.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// No token was configured and none could be resolved from the secret store.
    #[error("No API token configured for {source_label}.\n{hint}")]
    MissingToken { source_label: String, hint: String },

    /// The secret store has no value under the requested name.
    #[error("Secret '{name}' not found in {store}")]
    SecretNotFound { name: String, store: String },

    /// The secret store exists but could not be read.
    #[error("Failed to read secret '{name}': {reason}")]
    SecretUnreadable { name: String, reason: String },

    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The extra root certificate could not be loaded.
    #[error("Failed to load CA certificate '{path}': {reason}\nCheck --cert-path points to a PEM file.")]
    CertificateLoad { path: PathBuf, reason: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The request never produced a response.
    #[error("Request to '{url}' failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s\nIncrease --timeout.")]
    RequestTimeout { url: String, secs: u64 },

    /// The API answered with a non-success status.
    #[error("'{url}' returned HTTP {status}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    /// The API answered 2xx but the payload did not match the expected shape.
    #[error("Unexpected response from '{url}': {reason}")]
    InvalidResponse { url: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialised to JSON.
    #[error("Failed to serialise record for '{path}': {reason}")]
    Serialize { path: PathBuf, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single record or page.
///
/// Collected into [`crate::ingest::SourceReport::failures`]. The source
/// keeps going with the remaining records.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum RecordError {
    /// The normalised record could not be written.
    #[error("Record {id}: write to '{path}' failed: {detail}")]
    WriteFailed {
        id: String,
        path: PathBuf,
        detail: String,
    },

    /// The wiki page body could not be fetched.
    #[error("Page {id}: content unavailable: {detail}")]
    ContentUnavailable { id: String, detail: String },
}

impl RecordError {
    /// Identifier of the record or page the error belongs to.
    pub fn id(&self) -> &str {
        match self {
            RecordError::WriteFailed { id, .. } | RecordError::ContentUnavailable { id, .. } => id,
        }
    }
}
