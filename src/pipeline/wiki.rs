//! Wiki API client (Confluence-style REST).
//!
//! * `GET {base}/rest/api/content/{id}?expand=body.storage` → storage-format
//!   HTML at `body.storage.value`
//! * `GET {base}/rest/api/content/{id}/child/page?start=&limit=` → direct
//!   children, paged until `_links.next` disappears

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::pipeline::http;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use tracing::debug;

/// Where wiki pages come from.
#[async_trait]
pub trait WikiSource: Send + Sync {
    /// Storage-format HTML body of a page. Missing bodies are `""`.
    async fn page_content(&self, page_id: &str) -> Result<String, IngestError>;

    /// Direct children of a page, in API order.
    async fn child_pages(&self, page_id: &str) -> Result<Vec<ChildPage>, IngestError>;
}

/// A child page reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChildPage {
    #[serde(default)]
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
}

impl ChildPage {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

fn untitled() -> String {
    "Untitled".to_string()
}

// ── Wire shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Content {
    body: Body,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Body {
    storage: Storage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Storage {
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChildListing {
    results: Vec<ChildPage>,
    #[serde(rename = "_links")]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Links {
    next: Option<String>,
}

/// [`WikiSource`] over the wiki REST API with bearer-token auth.
pub struct WikiClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
    timeout_secs: u64,
}

impl WikiClient {
    pub fn new(client: Client, config: &IngestConfig, token: String) -> Result<Self, IngestError> {
        let base_url = config
            .wiki_api_url
            .clone()
            .ok_or_else(|| IngestError::InvalidConfig("Wiki API URL is not set".into()))?;
        Ok(Self {
            client,
            base_url,
            token,
            page_size: config.page_size,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn content_url(&self, page_id: &str) -> String {
        format!("{}/rest/api/content/{}", self.base_url, page_id)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, IngestError> {
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .query(params);
        http::get_json(request, url, self.timeout_secs).await
    }
}

#[async_trait]
impl WikiSource for WikiClient {
    async fn page_content(&self, page_id: &str) -> Result<String, IngestError> {
        let url = self.content_url(page_id);
        let content: Content = self
            .get(&url, &[("expand", "body.storage".to_string())])
            .await?;
        Ok(content.body.storage.value)
    }

    async fn child_pages(&self, page_id: &str) -> Result<Vec<ChildPage>, IngestError> {
        let url = format!("{}/child/page", self.content_url(page_id));
        let children = collect_children(|start| {
            let params = [
                ("start", start.to_string()),
                ("limit", self.page_size.to_string()),
            ];
            let url = &url;
            async move { self.get::<ChildListing>(url, &params).await }
        })
        .await?;
        debug!("Page {} has {} child page(s)", page_id, children.len());
        Ok(children)
    }
}

/// Read child listings from offset 0, advancing `start` by the number of
/// results each time, until a listing is empty or has no `_links.next`.
async fn collect_children<F, Fut>(mut fetch_listing: F) -> Result<Vec<ChildPage>, IngestError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<ChildListing, IngestError>>,
{
    let mut children = Vec::new();
    let mut start = 0usize;
    loop {
        let listing = fetch_listing(start).await?;
        let fetched = listing.results.len();
        children.extend(listing.results);

        if fetched == 0 || listing.links.next.is_none() {
            break;
        }
        start += fetched;
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_body_is_extracted() {
        let c: Content =
            serde_json::from_str(r#"{"id":"1","body":{"storage":{"value":"<p>x</p>","representation":"storage"}}}"#)
                .unwrap();
        assert_eq!(c.body.storage.value, "<p>x</p>");
    }

    #[test]
    fn missing_body_is_empty() {
        let c: Content = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
        assert_eq!(c.body.storage.value, "");
    }

    #[test]
    fn child_listing_parses() {
        let l: ChildListing = serde_json::from_str(
            r#"{"results":[{"id":"11","title":"Intro","type":"page"},{"id":"12"}],
                "start":0,"limit":25,"size":2,"_links":{"next":"/rest/api/content/1/child/page?start=25"}}"#,
        )
        .unwrap();
        assert_eq!(
            l.results,
            vec![ChildPage::new("11", "Intro"), ChildPage::new("12", "Untitled")]
        );
        assert!(l.links.next.is_some());
    }

    #[test]
    fn last_child_page_has_no_next() {
        let l: ChildListing = serde_json::from_str(r#"{"results":[],"_links":{}}"#).unwrap();
        assert!(l.links.next.is_none());
    }

    #[test]
    fn urls() {
        let config = IngestConfig {
            wiki_api_url: Some("https://wiki.example.test:8443".into()),
            ..IngestConfig::default()
        };
        let c = WikiClient::new(Client::new(), &config, "t".into()).unwrap();
        assert_eq!(
            c.content_url("892986628"),
            "https://wiki.example.test:8443/rest/api/content/892986628"
        );
    }

    fn listing(ids: &[&str], next: bool) -> ChildListing {
        ChildListing {
            results: ids.iter().map(|id| ChildPage::new(*id, *id)).collect(),
            links: Links {
                next: next.then(|| "/next".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn children_page_until_next_is_absent() {
        let mut starts = Vec::new();
        let children = collect_children(|start| {
            starts.push(start);
            let page = match start {
                0 => listing(&["a", "b", "c"], true),
                3 => listing(&["d", "e"], true),
                _ => listing(&["f"], false),
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(starts, vec![0, 3, 5]);
        let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[tokio::test]
    async fn empty_listing_stops_paging() {
        let mut calls = 0;
        let children = collect_children(|_| {
            calls += 1;
            async move { Ok(listing(&[], true)) }
        })
        .await
        .unwrap();

        assert!(children.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn listing_error_is_returned() {
        let result = collect_children(|start| async move {
            if start == 0 {
                Ok(listing(&["a"], true))
            } else {
                Err(IngestError::HttpStatus {
                    url: "https://wiki.example.test/rest/api/content/1/child/page".into(),
                    status: 500,
                    body: String::new(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(IngestError::HttpStatus { status: 500, .. })));
    }
}
