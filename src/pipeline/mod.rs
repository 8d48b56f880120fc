//! Pipeline stages around the Markdown core: fetch, filter, write.
//!
//! Each submodule owns one concern and is independently testable. The two
//! network-facing sources sit behind async traits ([`qa::QaSource`],
//! [`wiki::WikiSource`]) so orchestration can run against in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! Q&A:   qa::list ──▶ filter::select_ids ──▶ qa::fetch_by_ids ──▶ record::normalize ──▶ output
//!        (paged)      (tag match)             (batched by id)      (HTML → Markdown)    (JSON)
//!
//! wiki:  wiki::child_pages ──▶ wiki::page_content ──▶ markdown ──▶ output
//!        (depth-first walk)
//! ```
//!
//! 1. [`secrets`]: resolve API tokens from explicit values or a secret store
//! 2. [`http`]: shared `reqwest` client (timeout, extra root CA) and
//!    response decoding
//! 3. [`qa`]: Q&A listing and by-id fetches
//! 4. [`wiki`]: wiki page bodies and child listings
//! 5. [`filter`]: tag filter over listed records
//! 6. [`output`]: atomic pretty-JSON file writes

pub mod filter;
pub mod http;
pub mod output;
pub mod qa;
pub mod secrets;
pub mod wiki;
