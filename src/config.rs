//! Configuration types for an ingestion run.
//!
//! All run behaviour is controlled through [`IngestConfig`], built via its
//! [`IngestConfigBuilder`]. Setters clamp values into their valid range;
//! [`IngestConfigBuilder::build`] rejects combinations that cannot work
//! (an enabled source without its API URL, zero concurrency, …).

use crate::error::IngestError;
use crate::pipeline::filter::DEFAULT_TAGS;
use crate::progress::ProgressCallback;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for an ingestion run.
///
/// # Example
/// ```rust
/// use kb_ingest::{FetchWindow, IngestConfig, SourceKind};
///
/// let config = IngestConfig::builder()
///     .sources(vec![SourceKind::Questions])
///     .qa_api_url("https://qa.example.test/api/2.3")
///     .qa_api_key("secret")
///     .window(FetchWindow::InitialLoad)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 25);
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Sources to ingest, in run order. Default: articles, questions, wiki.
    pub sources: Vec<SourceKind>,

    /// Which items to list from the Q&A API. Default: last 24 hours.
    pub window: FetchWindow,

    /// Base URL of the Q&A API, e.g. `https://qa.example.com/api/2.3`.
    pub qa_api_url: Option<String>,

    /// Q&A API key. Takes precedence over `qa_api_key_param`.
    pub qa_api_key: Option<String>,

    /// Secret-store name holding the Q&A API key.
    pub qa_api_key_param: Option<String>,

    /// Base URL of the wiki, e.g. `https://wiki.example.com`.
    pub wiki_api_url: Option<String>,

    /// Wiki bearer token. Takes precedence over `wiki_api_key_param`.
    pub wiki_api_key: Option<String>,

    /// Secret-store name holding the wiki bearer token.
    pub wiki_api_key_param: Option<String>,

    /// Extra PEM root certificate for internal endpoints.
    pub cert_path: Option<PathBuf>,

    /// Root of the Q&A output tree (`<dir>/articles`, `<dir>/questions`). Default: `/tmp`.
    pub output_dir: PathBuf,

    /// Root of the wiki output tree. Default: `<output_dir>/confluence`.
    pub wiki_output_dir: Option<PathBuf>,

    /// A record is kept when at least one of its tags is in this list.
    pub tags: Vec<String>,

    /// Wiki pages to start from.
    pub wiki_roots: Vec<WikiRoot>,

    /// Items per listing page (1–100). Default: 100.
    pub page_size: u32,

    /// Ids per by-id request (1–100). Default: 25.
    pub batch_size: usize,

    /// Stop listing after this many pages. Default: no limit.
    pub max_pages: Option<usize>,

    /// Concurrent by-id requests. Default: 4.
    pub concurrency: usize,

    /// Per-request timeout in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sources: SourceKind::ALL.to_vec(),
            window: FetchWindow::default(),
            qa_api_url: None,
            qa_api_key: None,
            qa_api_key_param: None,
            wiki_api_url: None,
            wiki_api_key: None,
            wiki_api_key_param: None,
            cert_path: None,
            output_dir: PathBuf::from("/tmp"),
            wiki_output_dir: None,
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            wiki_roots: Vec::new(),
            page_size: 100,
            batch_size: 25,
            max_pages: None,
            concurrency: 4,
            request_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("sources", &self.sources)
            .field("window", &self.window)
            .field("qa_api_url", &self.qa_api_url)
            .field("qa_api_key", &self.qa_api_key.as_ref().map(|_| "<redacted>"))
            .field("qa_api_key_param", &self.qa_api_key_param)
            .field("wiki_api_url", &self.wiki_api_url)
            .field("wiki_api_key", &self.wiki_api_key.as_ref().map(|_| "<redacted>"))
            .field("wiki_api_key_param", &self.wiki_api_key_param)
            .field("cert_path", &self.cert_path)
            .field("output_dir", &self.output_dir)
            .field("wiki_output_dir", &self.wiki_output_dir)
            .field("tags", &self.tags)
            .field("wiki_roots", &self.wiki_roots)
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether `source` is part of this run.
    pub fn is_enabled(&self, source: SourceKind) -> bool {
        self.sources.contains(&source)
    }

    /// Directory wiki pages are written under.
    pub fn wiki_dir(&self) -> PathBuf {
        self.wiki_output_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("confluence"))
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn sources(mut self, sources: Vec<SourceKind>) -> Self {
        let mut unique = Vec::with_capacity(sources.len());
        for s in sources {
            if !unique.contains(&s) {
                unique.push(s);
            }
        }
        self.config.sources = unique;
        self
    }

    pub fn window(mut self, window: FetchWindow) -> Self {
        self.config.window = window;
        self
    }

    pub fn qa_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.qa_api_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn qa_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.qa_api_key = Some(key.into());
        self
    }

    pub fn qa_api_key_param(mut self, name: impl Into<String>) -> Self {
        self.config.qa_api_key_param = Some(name.into());
        self
    }

    pub fn wiki_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.wiki_api_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn wiki_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.wiki_api_key = Some(key.into());
        self
    }

    pub fn wiki_api_key_param(mut self, name: impl Into<String>) -> Self {
        self.config.wiki_api_key_param = Some(name.into());
        self
    }

    pub fn cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cert_path = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn wiki_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.wiki_output_dir = Some(dir.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn wiki_root(mut self, root: WikiRoot) -> Self {
        self.config.wiki_roots.push(root);
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.config.page_size = n.clamp(1, 100);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.clamp(1, 100);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n.max(1));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.sources.is_empty() {
            return Err(IngestError::InvalidConfig(
                "At least one source must be enabled".into(),
            ));
        }
        let needs_qa = c.is_enabled(SourceKind::Articles) || c.is_enabled(SourceKind::Questions);
        if needs_qa && c.qa_api_url.is_none() {
            return Err(IngestError::InvalidConfig(
                "Q&A sources are enabled but no Q&A API URL is set".into(),
            ));
        }
        if c.is_enabled(SourceKind::Wiki) {
            if c.wiki_api_url.is_none() {
                return Err(IngestError::InvalidConfig(
                    "Wiki source is enabled but no wiki API URL is set".into(),
                ));
            }
            if c.wiki_roots.is_empty() {
                return Err(IngestError::InvalidConfig(
                    "Wiki source is enabled but no wiki root pages are configured".into(),
                ));
            }
        }
        if c.concurrency == 0 {
            return Err(IngestError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.batch_size == 0 || c.batch_size > 100 {
            return Err(IngestError::InvalidConfig(format!(
                "Batch size must be 1–100, got {}",
                c.batch_size
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// A content source the run can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Q&A articles.
    Articles,
    /// Q&A questions with their answers.
    Questions,
    /// Wiki page trees.
    Wiki,
}

impl SourceKind {
    /// Every source, in run order.
    pub const ALL: [SourceKind; 3] = [SourceKind::Articles, SourceKind::Questions, SourceKind::Wiki];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Articles => "articles",
            SourceKind::Questions => "questions",
            SourceKind::Wiki => "wiki",
        })
    }
}

/// Which Q&A items a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchWindow {
    /// Everything, no date filter.
    InitialLoad,
    /// Items created at or after this Unix timestamp.
    Since(i64),
    /// Items created in the last N hours before the run.
    LastHours(u32),
}

impl Default for FetchWindow {
    fn default() -> Self {
        FetchWindow::LastHours(24)
    }
}

impl FetchWindow {
    /// The `fromdate` filter for this window, relative to `now`.
    pub fn from_date(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            FetchWindow::InitialLoad => None,
            FetchWindow::Since(ts) => Some(*ts),
            FetchWindow::LastHours(h) => Some((now - Duration::hours(i64::from(*h))).timestamp()),
        }
    }
}

/// How much of a wiki tree to ingest from a root page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WikiScope {
    /// Every descendant of the root (the root page itself is not written).
    Descendants,
    /// Only the root page, titled with its classifier.
    Single,
}

/// A wiki starting page and the classifier its output is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiRoot {
    pub page_id: String,
    pub classifier: String,
    pub scope: WikiScope,
}

impl WikiRoot {
    /// Ingest all descendants of `page_id`.
    pub fn descendants(page_id: impl Into<String>, classifier: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            classifier: classifier.into(),
            scope: WikiScope::Descendants,
        }
    }

    /// Ingest only `page_id`.
    pub fn single(page_id: impl Into<String>, classifier: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            classifier: classifier.into(),
            scope: WikiScope::Single,
        }
    }

    /// Parse `ID=CLASSIFIER`.
    pub fn parse(arg: &str, scope: WikiScope) -> Result<Self, IngestError> {
        let (id, classifier) = arg.split_once('=').ok_or_else(|| {
            IngestError::InvalidConfig(format!("Expected PAGE_ID=CLASSIFIER, got '{arg}'"))
        })?;
        let (id, classifier) = (id.trim(), classifier.trim());
        if id.is_empty() || classifier.is_empty() {
            return Err(IngestError::InvalidConfig(format!(
                "Page id and classifier must be non-empty in '{arg}'"
            )));
        }
        Ok(Self {
            page_id: id.to_string(),
            classifier: classifier.to_string(),
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn qa_builder() -> IngestConfigBuilder {
        IngestConfig::builder()
            .sources(vec![SourceKind::Articles, SourceKind::Questions])
            .qa_api_url("https://qa.example.test/api/")
    }

    #[test]
    fn defaults() {
        let c = IngestConfig::default();
        assert_eq!(c.sources, SourceKind::ALL.to_vec());
        assert_eq!(c.window, FetchWindow::LastHours(24));
        assert_eq!(c.page_size, 100);
        assert_eq!(c.batch_size, 25);
        assert!(c.tags.iter().any(|t| t == "terraform"));
        assert_eq!(c.wiki_dir(), PathBuf::from("/tmp/confluence"));
    }

    #[test]
    fn setters_clamp() {
        let c = qa_builder()
            .page_size(500)
            .batch_size(0)
            .concurrency(0)
            .request_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.page_size, 100);
        assert_eq!(c.batch_size, 1);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.request_timeout_secs, 1);
    }

    #[test]
    fn url_trailing_slash_is_trimmed() {
        let c = qa_builder().build().unwrap();
        assert_eq!(c.qa_api_url.as_deref(), Some("https://qa.example.test/api"));
    }

    #[test]
    fn qa_source_requires_url() {
        let err = IngestConfig::builder()
            .sources(vec![SourceKind::Questions])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Q&A API URL"));
    }

    #[test]
    fn wiki_source_requires_roots() {
        let err = IngestConfig::builder()
            .sources(vec![SourceKind::Wiki])
            .wiki_api_url("https://wiki.example.test")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("root pages"));

        let ok = IngestConfig::builder()
            .sources(vec![SourceKind::Wiki])
            .wiki_api_url("https://wiki.example.test")
            .wiki_root(WikiRoot::descendants("1", "ops"))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn empty_sources_rejected() {
        assert!(IngestConfig::builder().sources(vec![]).build().is_err());
    }

    #[test]
    fn duplicate_sources_collapse() {
        let c = qa_builder()
            .sources(vec![SourceKind::Questions, SourceKind::Questions])
            .build()
            .unwrap();
        assert_eq!(c.sources, vec![SourceKind::Questions]);
    }

    #[test]
    fn debug_redacts_tokens() {
        let c = qa_builder().qa_api_key("super-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn fetch_window_from_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(FetchWindow::InitialLoad.from_date(now), None);
        assert_eq!(FetchWindow::Since(42).from_date(now), Some(42));
        assert_eq!(
            FetchWindow::LastHours(24).from_date(now),
            Some(now.timestamp() - 86_400)
        );
    }

    #[test]
    fn wiki_root_parse() {
        let root = WikiRoot::parse("892986628=tfe", WikiScope::Descendants).unwrap();
        assert_eq!(root, WikiRoot::descendants("892986628", "tfe"));
        assert!(WikiRoot::parse("no-separator", WikiScope::Single).is_err());
        assert!(WikiRoot::parse("=x", WikiScope::Single).is_err());
    }
}
