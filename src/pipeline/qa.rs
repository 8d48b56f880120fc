//! Q&A API client.
//!
//! Two calls per content kind:
//!
//! * **listing**: `GET {base}/{articles|questions}` page by page (1-based
//!   `page`, `pagesize`) until the envelope says `has_more: false`, using a
//!   filter that includes tags and ids.
//! * **by id**: `GET {base}/{kind}/{id;id;…}` in batches, using a filter that
//!   includes bodies (and answers, for questions). `pagesize` equals the batch
//!   size and pages are still followed while `has_more`. Batches run with
//!   bounded concurrency; results keep batch order.
//!
//! Every request carries the API `key`; listings also carry `fromdate` when
//! the run has a time window.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::pipeline::http;
use crate::record::{RecordId, RecordKind, SourceRecord};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, warn};

/// Filter returning listing fields (ids, tags) plus article bodies.
pub const LISTING_FILTER: &str = "!nNPvSNW(gA";

/// Filter returning question bodies with their answers.
pub const QUESTION_DETAIL_FILTER: &str = "!6WPIomnMNcVD9";

/// Where Q&A records come from.
#[async_trait]
pub trait QaSource: Send + Sync {
    /// Every record of `kind` in the run's window.
    async fn list(&self, kind: RecordKind) -> Result<Vec<SourceRecord>, IngestError>;

    /// Full records for `ids`, in request order.
    async fn fetch_by_ids(
        &self,
        kind: RecordKind,
        ids: &[RecordId],
    ) -> Result<Vec<SourceRecord>, IngestError>;
}

/// Response envelope shared by every Q&A endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    items: Vec<SourceRecord>,
    has_more: bool,
}

/// [`QaSource`] over the Q&A REST API.
pub struct QaClient {
    client: Client,
    base_url: String,
    key: String,
    from_date: Option<i64>,
    page_size: u32,
    batch_size: usize,
    max_pages: Option<usize>,
    concurrency: usize,
    timeout_secs: u64,
}

impl QaClient {
    pub fn new(
        client: Client,
        config: &IngestConfig,
        key: String,
        from_date: Option<i64>,
    ) -> Result<Self, IngestError> {
        let base_url = config
            .qa_api_url
            .clone()
            .ok_or_else(|| IngestError::InvalidConfig("Q&A API URL is not set".into()))?;
        Ok(Self {
            client,
            base_url,
            key,
            from_date,
            page_size: config.page_size,
            batch_size: config.batch_size,
            max_pages: config.max_pages,
            concurrency: config.concurrency,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Query parameters for listing page `page` (1-based).
    fn listing_params(&self, page: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![("key", self.key.clone())];
        if let Some(ts) = self.from_date {
            params.push(("fromdate", ts.to_string()));
        }
        params.push(("pagesize", self.page_size.to_string()));
        params.push(("page", page.to_string()));
        params.push(("filter", LISTING_FILTER.to_string()));
        params
    }

    /// Query parameters for page `page` of a by-id lookup. The page size
    /// matches the batch size so one page normally covers a whole batch.
    fn by_id_params(&self, kind: RecordKind, page: usize) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.key.clone()),
            ("pagesize", self.batch_size.to_string()),
            ("page", page.to_string()),
            ("filter", detail_filter(kind).to_string()),
        ]
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Envelope, IngestError> {
        let url = format!("{}/{}", self.base_url, path);
        let request = self.client.get(&url).query(params);
        http::get_json(request, &url, self.timeout_secs).await
    }
}

#[async_trait]
impl QaSource for QaClient {
    async fn list(&self, kind: RecordKind) -> Result<Vec<SourceRecord>, IngestError> {
        let (records, pages) = collect_pages(self.max_pages, |page| {
            let params = self.listing_params(page);
            async move { self.get(kind.endpoint(), &params).await }
        })
        .await?;
        info!("Listed {} {} across {} page(s)", records.len(), kind, pages);
        Ok(records)
    }

    async fn fetch_by_ids(
        &self,
        kind: RecordKind,
        ids: &[RecordId],
    ) -> Result<Vec<SourceRecord>, IngestError> {
        let batches = id_batches(ids, self.batch_size);
        debug!("Fetching {} {} in {} batch(es)", ids.len(), kind, batches.len());

        fetch_batches(batches, self.concurrency, move |joined| async move {
            let path = format!("{}/{}", kind.endpoint(), joined);
            let (records, _) = collect_pages(None, |page| {
                let params = self.by_id_params(kind, page);
                let path = &path;
                async move { self.get(path, &params).await }
            })
            .await?;
            Ok(records)
        })
        .await
    }
}

/// Fetch 1-based pages until one reports `has_more: false` or `max_pages`
/// pages have been read. Returns the items and the number of pages read.
async fn collect_pages<F, Fut>(
    max_pages: Option<usize>,
    mut fetch_page: F,
) -> Result<(Vec<SourceRecord>, usize), IngestError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Envelope, IngestError>>,
{
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let envelope = fetch_page(page).await?;
        debug!("Page {}: {} item(s)", page, envelope.items.len());
        records.extend(envelope.items);

        if !envelope.has_more {
            break;
        }
        if max_pages.is_some_and(|max| page >= max) {
            warn!("Stopping listing at page cap {}", page);
            break;
        }
        page += 1;
    }
    Ok((records, page))
}

/// Run `fetch_batch` over every batch with at most `concurrency` in flight.
/// Results keep batch order; the first error wins.
async fn fetch_batches<F, Fut>(
    batches: Vec<String>,
    concurrency: usize,
    fetch_batch: F,
) -> Result<Vec<SourceRecord>, IngestError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<SourceRecord>, IngestError>>,
{
    let pages: Vec<Vec<SourceRecord>> = stream::iter(batches.into_iter().map(fetch_batch))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    Ok(pages.into_iter().flatten().collect())
}

/// Filter used for by-id lookups of `kind`.
pub fn detail_filter(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Article => LISTING_FILTER,
        RecordKind::Question => QUESTION_DETAIL_FILTER,
    }
}

/// Split `ids` into `;`-joined groups of at most `size`.
pub fn id_batches(ids: &[RecordId], size: usize) -> Vec<String> {
    ids.chunks(size.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchWindow, SourceKind};

    fn client(from_date: Option<i64>) -> QaClient {
        let config = IngestConfig::builder()
            .sources(vec![SourceKind::Questions])
            .qa_api_url("https://qa.example.test/api/2.3")
            .page_size(50)
            .window(FetchWindow::InitialLoad)
            .build()
            .unwrap();
        QaClient::new(Client::new(), &config, "k".into(), from_date).unwrap()
    }

    fn ids(range: std::ops::RangeInclusive<i64>) -> Vec<RecordId> {
        range.map(RecordId::Number).collect()
    }

    #[test]
    fn batches_of_25() {
        let batches = id_batches(&ids(1..=60), 25);
        assert_eq!(batches.len(), 3);
        assert!(batches[0].starts_with("1;2;3;"));
        assert!(batches[0].ends_with(";25"));
        assert_eq!(batches[2], (51..=60).map(|i| i.to_string()).collect::<Vec<_>>().join(";"));
    }

    #[test]
    fn no_ids_no_batches() {
        assert!(id_batches(&[], 25).is_empty());
    }

    #[test]
    fn listing_params_with_window() {
        let params = client(Some(1_700_000_000)).listing_params(1);
        assert_eq!(
            params,
            vec![
                ("key", "k".to_string()),
                ("fromdate", "1700000000".to_string()),
                ("pagesize", "50".to_string()),
                ("page", "1".to_string()),
                ("filter", LISTING_FILTER.to_string()),
            ]
        );
    }

    #[test]
    fn listing_params_without_window_skip_fromdate() {
        let params = client(None).listing_params(3);
        assert!(params.iter().all(|(k, _)| *k != "fromdate"));
        assert!(params.contains(&("page", "3".to_string())));
    }

    #[test]
    fn detail_filters() {
        assert_eq!(detail_filter(RecordKind::Article), LISTING_FILTER);
        assert_eq!(detail_filter(RecordKind::Question), QUESTION_DETAIL_FILTER);
        let params = client(Some(1)).by_id_params(RecordKind::Question, 2);
        assert!(params.iter().all(|(k, _)| *k != "fromdate"));
    }

    #[test]
    fn envelope_defaults() {
        let env: Envelope = serde_json::from_str(r#"{"items":[{"question_id":1}]}"#).unwrap();
        assert_eq!(env.items.len(), 1);
        assert!(!env.has_more);
        let empty: Envelope = serde_json::from_str("{}").unwrap();
        assert!(empty.items.is_empty());
    }

    #[test]
    fn new_requires_url() {
        let config = IngestConfig::default();
        assert!(QaClient::new(Client::new(), &config, "k".into(), None).is_err());
    }

    #[test]
    fn by_id_page_size_matches_batch_size() {
        let config = IngestConfig::builder()
            .sources(vec![SourceKind::Articles])
            .qa_api_url("https://qa.example.test")
            .batch_size(100)
            .build()
            .unwrap();
        let c = QaClient::new(Client::new(), &config, "k".into(), None).unwrap();
        assert_eq!(
            c.by_id_params(RecordKind::Article, 1),
            vec![
                ("key", "k".to_string()),
                ("pagesize", "100".to_string()),
                ("page", "1".to_string()),
                ("filter", LISTING_FILTER.to_string()),
            ]
        );
    }

    fn question(id: i64) -> SourceRecord {
        SourceRecord {
            question_id: Some(RecordId::Number(id)),
            ..SourceRecord::default()
        }
    }

    fn envelope(ids: &[i64], has_more: bool) -> Envelope {
        Envelope {
            items: ids.iter().copied().map(question).collect(),
            has_more,
        }
    }

    fn question_ids(records: &[SourceRecord]) -> Vec<i64> {
        records
            .iter()
            .filter_map(|r| match r.question_id {
                Some(RecordId::Number(n)) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn pages_start_at_one_and_stop_without_more() {
        let mut requested = Vec::new();
        let (records, pages) = collect_pages(None, |page| {
            requested.push(page);
            async move { Ok(envelope(&[page as i64 * 10, page as i64 * 10 + 1], page < 3)) }
        })
        .await
        .unwrap();

        assert_eq!(requested, vec![1, 2, 3]);
        assert_eq!(pages, 3);
        assert_eq!(question_ids(&records), vec![10, 11, 20, 21, 30, 31]);
    }

    #[tokio::test]
    async fn page_cap_stops_listing() {
        let mut requested = Vec::new();
        let (records, pages) = collect_pages(Some(2), |page| {
            requested.push(page);
            async move { Ok(envelope(&[page as i64], true)) }
        })
        .await
        .unwrap();

        assert_eq!(requested, vec![1, 2]);
        assert_eq!(pages, 2);
        assert_eq!(question_ids(&records), vec![1, 2]);
    }

    #[tokio::test]
    async fn batch_pages_past_the_first_are_followed() {
        // 100 ids answered 30 at a time.
        let all: Vec<i64> = (1..=100).collect();
        let (records, _) = collect_pages(None, |page| {
            let chunk: Vec<i64> = all.chunks(30).nth(page - 1).unwrap_or_default().to_vec();
            let more = page * 30 < all.len();
            async move { Ok(envelope(&chunk, more)) }
        })
        .await
        .unwrap();

        assert_eq!(question_ids(&records), all);
    }

    #[tokio::test]
    async fn page_error_is_returned() {
        let result = collect_pages(None, |page| async move {
            if page == 2 {
                Err(IngestError::InvalidResponse {
                    url: "https://qa.example.test/questions".into(),
                    reason: "truncated".into(),
                })
            } else {
                Ok(envelope(&[1], true))
            }
        })
        .await;
        assert!(matches!(result, Err(IngestError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn batches_keep_order_when_finishing_out_of_order() {
        let batches = id_batches(&ids(1..=6), 2);
        let records = fetch_batches(batches, 3, |joined| async move {
            let ids: Vec<i64> = joined.split(';').filter_map(|s| s.parse().ok()).collect();
            // Earlier batches finish last.
            let delay = 30 - ids[0] as u64 * 5;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            Ok(ids.into_iter().map(question).collect())
        })
        .await
        .unwrap();

        assert_eq!(question_ids(&records), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn failed_batch_fails_the_fetch() {
        let batches = id_batches(&ids(1..=4), 2);
        let result = fetch_batches(batches, 2, |joined| async move {
            if joined.starts_with('3') {
                Err(IngestError::RequestTimeout {
                    url: "https://qa.example.test/questions/3;4".into(),
                    secs: 30,
                })
            } else {
                Ok(vec![question(1)])
            }
        })
        .await;
        assert!(matches!(result, Err(IngestError::RequestTimeout { .. })));
    }
}
