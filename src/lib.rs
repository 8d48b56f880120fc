//! # kb-ingest
//!
//! Pull Q&A articles, questions and wiki pages, keep the ones about the
//! topics you care about, convert their HTML bodies to Markdown and write
//! them as JSON records for a knowledge-base indexer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Q&A API / wiki API
//!  │
//!  ├─ 1. Secrets  resolve API tokens (explicit value or secret store)
//!  ├─ 2. List     paged Q&A listings, recursive wiki child listings
//!  ├─ 3. Filter   keep Q&A records carrying a wanted tag
//!  ├─ 4. Fetch    bodies by id, batched with bounded concurrency
//!  ├─ 5. Convert  HTML → Markdown (the `markdown` module)
//!  └─ 6. Output   <dir>/{articles,questions}/<id>.json, <wiki dir>/<class>/<title>.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kb_ingest::{run, EnvSecretStore, FetchWindow, IngestConfig, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::builder()
//!         .sources(vec![SourceKind::Articles, SourceKind::Questions])
//!         .qa_api_url("https://qa.example.com/api/2.3")
//!         .qa_api_key_param("/kb/qa-api-key")
//!         .window(FetchWindow::LastHours(24))
//!         .output_dir("/data/raw")
//!         .build()?;
//!     let report = run(&config, &EnvSecretStore).await?;
//!     eprintln!("{} records written", report.total_written());
//!     Ok(())
//! }
//! ```
//!
//! The converter is usable on its own:
//!
//! ```rust
//! assert_eq!(
//!     kb_ingest::html_to_markdown("<p>Hello <strong>world</strong></p>"),
//!     "Hello **world**"
//! );
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `kb-ingest` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod markdown;
pub mod pipeline;
pub mod progress;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FetchWindow, IngestConfig, IngestConfigBuilder, SourceKind, WikiRoot, WikiScope};
pub use error::{IngestError, RecordError};
pub use ingest::{ingest_records, ingest_wiki, run, IngestReport, SourceReport};
pub use markdown::html_to_markdown;
pub use pipeline::filter::{TagFilter, DEFAULT_TAGS};
pub use pipeline::qa::{QaClient, QaSource};
pub use pipeline::secrets::{DirSecretStore, EnvSecretStore, SecretStore, StaticSecretStore};
pub use pipeline::wiki::{ChildPage, WikiClient, WikiSource};
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{
    normalize, NormalizedAnswer, NormalizedRecord, RecordId, RecordKind, SourceAnswer, SourceRecord,
    WikiPage,
};
