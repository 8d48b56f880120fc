//! Ingestion entry points.
//!
//! [`run`] drives a whole run from an [`IngestConfig`]; [`ingest_records`] and
//! [`ingest_wiki`] run one source against any [`QaSource`] / [`WikiSource`],
//! which is how the integration tests drive them without a network.
//!
//! Fatal failures (credentials, listing or fetch errors, an output directory
//! that cannot be created) abort with [`IngestError`]. A single record that
//! cannot be written, or a wiki page whose body cannot be fetched, becomes a
//! [`RecordError`] in the [`SourceReport`] and the source carries on.

use crate::config::{IngestConfig, SourceKind, WikiRoot, WikiScope};
use crate::error::{IngestError, RecordError};
use crate::markdown::html_to_markdown;
use crate::pipeline::filter::TagFilter;
use crate::pipeline::http;
use crate::pipeline::output::{self, record_path, wiki_file_name};
use crate::pipeline::qa::{QaClient, QaSource};
use crate::pipeline::secrets::{resolve_token, SecretStore};
use crate::pipeline::wiki::{ChildPage, WikiClient, WikiSource};
use crate::progress::ProgressCallback;
use crate::record::{normalize, RecordKind, WikiPage};
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// File stem used when a record carries no id.
pub const UNKNOWN_ID: &str = "unknown";

/// Outcome of one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceReport {
    /// Records returned by the listing (wiki: pages discovered).
    pub listed: usize,
    /// Records that passed the tag filter (wiki: same as `listed`).
    pub matched: usize,
    /// Files written.
    pub written: usize,
    /// Per-record failures.
    pub failures: Vec<RecordError>,
}

/// Outcome of a full run. Sources that were not enabled are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub articles: Option<SourceReport>,
    pub questions: Option<SourceReport>,
    pub wiki: Option<SourceReport>,
    pub duration_ms: u64,
}

impl IngestReport {
    fn sources(&self) -> impl Iterator<Item = &SourceReport> {
        [&self.articles, &self.questions, &self.wiki]
            .into_iter()
            .flatten()
    }

    pub fn total_written(&self) -> usize {
        self.sources().map(|s| s.written).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources().map(|s| s.failures.len()).sum()
    }
}

/// Run every enabled source in order: articles, questions, wiki.
///
/// Tokens not given explicitly in `config` are looked up in `secrets`.
pub async fn run(
    config: &IngestConfig,
    secrets: &dyn SecretStore,
) -> Result<IngestReport, IngestError> {
    let start = Instant::now();
    let mut report = IngestReport::default();
    info!("Starting ingestion: sources {:?}, window {:?}", config.sources, config.window);

    // ── Step 1: Build HTTP client ────────────────────────────────────────
    let client = http::build_client(config)?;

    // ── Step 2: Q&A sources ──────────────────────────────────────────────
    let wants_articles = config.is_enabled(SourceKind::Articles);
    let wants_questions = config.is_enabled(SourceKind::Questions);
    if wants_articles || wants_questions {
        let key = resolve_token(
            config.qa_api_key.as_deref(),
            config.qa_api_key_param.as_deref(),
            secrets,
            "the Q&A API",
        )?;
        let from_date = config.window.from_date(Utc::now());
        debug!("Q&A fromdate: {:?}", from_date);
        let qa = QaClient::new(client.clone(), config, key, from_date)?;

        if wants_articles {
            report.articles = Some(ingest_records(&qa, RecordKind::Article, config).await?);
        }
        if wants_questions {
            report.questions = Some(ingest_records(&qa, RecordKind::Question, config).await?);
        }
    }

    // ── Step 3: Wiki ─────────────────────────────────────────────────────
    if config.is_enabled(SourceKind::Wiki) {
        let token = resolve_token(
            config.wiki_api_key.as_deref(),
            config.wiki_api_key_param.as_deref(),
            secrets,
            "the wiki API",
        )?;
        let wiki = WikiClient::new(client, config, token)?;
        report.wiki = Some(
            ingest_wiki(
                &wiki,
                &config.wiki_roots,
                &config.wiki_dir(),
                config.progress_callback.as_ref(),
            )
            .await?,
        );
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Ingestion complete: {} written, {} failed, {}ms",
        report.total_written(),
        report.total_failed(),
        report.duration_ms
    );
    Ok(report)
}

/// List, filter, fetch, normalise and write one Q&A record kind.
///
/// Output goes to `<output_dir>/<articles|questions>/<id>.json`.
pub async fn ingest_records(
    source: &dyn QaSource,
    kind: RecordKind,
    config: &IngestConfig,
) -> Result<SourceReport, IngestError> {
    let source_kind = match kind {
        RecordKind::Article => SourceKind::Articles,
        RecordKind::Question => SourceKind::Questions,
    };
    let callback = config.progress_callback.as_ref();
    let mut report = SourceReport::default();

    // ── Step 1: List ─────────────────────────────────────────────────────
    info!("Fetching {}", kind);
    let listed = source.list(kind).await?;
    report.listed = listed.len();

    // ── Step 2: Tag filter ───────────────────────────────────────────────
    let ids = TagFilter::new(config.tags.iter().cloned()).select_ids(&listed, kind);
    report.matched = ids.len();
    info!("{} of {} {} match the tag filter", ids.len(), listed.len(), kind);

    // ── Step 3: Fetch full records ───────────────────────────────────────
    let records = if ids.is_empty() {
        Vec::new()
    } else {
        source.fetch_by_ids(kind, &ids).await?
    };
    if records.len() != ids.len() {
        warn!("Requested {} {} by id, received {}", ids.len(), kind, records.len());
    }

    // ── Step 4: Normalise and write ──────────────────────────────────────
    let dir = config.output_dir.join(kind.dir_name());
    create_dir(&dir).await?;
    if let Some(cb) = callback {
        cb.on_source_start(source_kind, Some(records.len()));
    }

    for record in &records {
        let id = record
            .id(kind)
            .map(ToString::to_string)
            .unwrap_or_else(|| UNKNOWN_ID.to_string());
        let path = record_path(&dir, &id);
        let normalized = normalize(record, kind);

        match output::write_json(&path, &normalized).await {
            Ok(()) => {
                report.written += 1;
                debug!("Saved {} {} to {}", kind, id, path.display());
                if let Some(cb) = callback {
                    cb.on_record_complete(source_kind, &id, &path);
                }
            }
            Err(e) => {
                warn!("Could not save {} {}: {}", kind, id, e);
                if let Some(cb) = callback {
                    cb.on_record_error(source_kind, &id, &e.to_string());
                }
                report.failures.push(RecordError::WriteFailed {
                    id,
                    path,
                    detail: e.to_string(),
                });
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_source_complete(source_kind, report.written, report.failures.len());
    }
    info!("Wrote {} {} to {}", report.written, kind, dir.display());
    Ok(report)
}

/// Convert and write every page reachable from `roots`.
///
/// Output goes to `<out_dir>/<classifier>/<title>.json`. When two different
/// pages map to the same file, the later one is saved as
/// `<title>_<page id>.json`.
pub async fn ingest_wiki(
    source: &dyn WikiSource,
    roots: &[WikiRoot],
    out_dir: &Path,
    callback: Option<&ProgressCallback>,
) -> Result<SourceReport, IngestError> {
    let mut report = SourceReport::default();
    let mut claimed = HashMap::new();
    if let Some(cb) = callback {
        cb.on_source_start(SourceKind::Wiki, None);
    }

    for root in roots {
        let dir = out_dir.join(&root.classifier);
        create_dir(&dir).await?;
        info!(
            "Processing wiki page {} ({:?}) as '{}'",
            root.page_id, root.scope, root.classifier
        );

        match root.scope {
            WikiScope::Single => {
                report.listed += 1;
                let page = ChildPage::new(root.page_id.clone(), root.classifier.clone());
                let target = PageTarget {
                    classifier: &root.classifier,
                    dir: &dir,
                };
                save_page(source, &page, &target, callback, &mut report, &mut claimed).await;
            }
            WikiScope::Descendants => {
                walk_descendants(source, root, &dir, callback, &mut report, &mut claimed).await;
            }
        }
    }

    report.matched = report.listed;
    if let Some(cb) = callback {
        cb.on_source_complete(SourceKind::Wiki, report.written, report.failures.len());
    }
    info!("Wrote {} wiki page(s) to {}", report.written, out_dir.display());
    Ok(report)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Depth-first pre-order walk below `root`; the root itself is not saved.
async fn walk_descendants(
    source: &dyn WikiSource,
    root: &WikiRoot,
    dir: &Path,
    callback: Option<&ProgressCallback>,
    report: &mut SourceReport,
    claimed: &mut HashMap<PathBuf, String>,
) {
    let target = PageTarget {
        classifier: &root.classifier,
        dir,
    };
    let mut visited = HashSet::from([root.page_id.clone()]);
    let mut stack: Vec<ChildPage> = children_of(source, &root.page_id).await;
    stack.reverse();

    while let Some(page) = stack.pop() {
        if page.id.is_empty() {
            warn!("Skipping child page '{}' without an id", page.title);
            continue;
        }
        if !visited.insert(page.id.clone()) {
            debug!("Page {} already visited, skipping", page.id);
            continue;
        }

        report.listed += 1;
        save_page(source, &page, &target, callback, report, claimed).await;

        let mut children = children_of(source, &page.id).await;
        children.reverse();
        stack.extend(children);
    }
}

async fn children_of(source: &dyn WikiSource, page_id: &str) -> Vec<ChildPage> {
    match source.child_pages(page_id).await {
        Ok(children) => children,
        Err(e) => {
            warn!("Could not list children of page {}: {}", page_id, e);
            Vec::new()
        }
    }
}

/// Where a root's pages are written.
struct PageTarget<'a> {
    classifier: &'a str,
    dir: &'a Path,
}

async fn save_page(
    source: &dyn WikiSource,
    page: &ChildPage,
    target: &PageTarget<'_>,
    callback: Option<&ProgressCallback>,
    report: &mut SourceReport,
    claimed: &mut HashMap<PathBuf, String>,
) {
    let html = match source.page_content(&page.id).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Could not fetch page {}: {}", page.id, e);
            if let Some(cb) = callback {
                cb.on_record_error(SourceKind::Wiki, &page.id, &e.to_string());
            }
            report.failures.push(RecordError::ContentUnavailable {
                id: page.id.clone(),
                detail: e.to_string(),
            });
            return;
        }
    };

    let record = WikiPage {
        page_id: page.id.clone(),
        title: page.title.clone(),
        classifier: target.classifier.to_string(),
        body_markdown: html_to_markdown(&html),
    };
    let path = page_path(target.dir, page, claimed);

    match output::write_json(&path, &record).await {
        Ok(()) => {
            report.written += 1;
            debug!("Saved page {} to {}", page.id, path.display());
            if let Some(cb) = callback {
                cb.on_record_complete(SourceKind::Wiki, &page.id, &path);
            }
        }
        Err(e) => {
            warn!("Could not save page {}: {}", page.id, e);
            if let Some(cb) = callback {
                cb.on_record_error(SourceKind::Wiki, &page.id, &e.to_string());
            }
            report.failures.push(RecordError::WriteFailed {
                id: page.id.clone(),
                path,
                detail: e.to_string(),
            });
        }
    }
}

/// `<dir>/<title>.json`, unless a different page already claimed that file
/// in this run; then `<dir>/<title>_<page id>.json`.
fn page_path(dir: &Path, page: &ChildPage, claimed: &mut HashMap<PathBuf, String>) -> PathBuf {
    let path = dir.join(wiki_file_name(&page.title));
    let path = match claimed.get(&path) {
        Some(owner) if *owner != page.id => {
            let fallback = dir.join(wiki_file_name(&format!("{} {}", page.title, page.id)));
            warn!(
                "Pages {} and {} both map to {}, saving {} as {}",
                owner,
                page.id,
                path.display(),
                page.id,
                fallback.display()
            );
            fallback
        }
        _ => path,
    };
    claimed.insert(path.clone(), page.id.clone());
    path
}

async fn create_dir(dir: &Path) -> Result<(), IngestError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| IngestError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}
