//! Progress-callback trait for per-record ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to receive
//! events as each source is listed, filtered and written.
//!
//! # Example
//!
//! ```rust
//! use kb_ingest::{IngestConfig, IngestProgressCallback, SourceKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for CountingCallback {
//!     fn on_record_complete(&self, source: SourceKind, id: &str, _path: &std::path::Path) {
//!         let n = self.written.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{source}: {id} written ({n} so far)");
//!     }
//! }
//!
//! let config = IngestConfig::builder()
//!     .sources(vec![SourceKind::Articles])
//!     .qa_api_url("https://qa.example.test/api/2.3")
//!     .progress_callback(Arc::new(CountingCallback { written: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::SourceKind;
use std::path::Path;
use std::sync::Arc;

/// Called by the ingestion run as it processes each source.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once per source after its records have been selected.
    ///
    /// # Arguments
    /// * `source`: the source being ingested
    /// * `total`: records that will be written, when known up front
    ///   (wiki traversal discovers pages as it goes and passes `None`)
    fn on_source_start(&self, source: SourceKind, total: Option<usize>) {
        let _ = (source, total);
    }

    /// Called after a record's file is written.
    fn on_record_complete(&self, source: SourceKind, id: &str, path: &Path) {
        let _ = (source, id, path);
    }

    /// Called when a single record could not be produced or written.
    fn on_record_error(&self, source: SourceKind, id: &str, error: &str) {
        let _ = (source, id, error);
    }

    /// Called once per source after every record has been attempted.
    fn on_source_complete(&self, source: SourceKind, written: usize, failed: usize) {
        let _ = (source, written, failed);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
