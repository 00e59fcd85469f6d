use crate::{env, BROWSER_USER_AGENT};
use html_scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use webbrief_core::{Error, Result, SearchProvider, SearchQuery, SearchResponse, SearchResult};

const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_REGION: &str = "us-en";

/// Provider names accepted by [`provider_from_name`].
pub const PROVIDER_NAMES: &[&str] = &["duckduckgo", "searxng"];

/// Most results any provider returns for one query.
pub const MAX_RESULTS_LIMIT: usize = 30;
const DEFAULT_RESULT_COUNT: usize = 10;

fn result_limit(q: &SearchQuery) -> usize {
    q.max_results
        .unwrap_or(DEFAULT_RESULT_COUNT)
        .min(MAX_RESULTS_LIMIT)
}

fn duckduckgo_endpoint_from_env() -> Option<String> {
    env("WEBBRIEF_DUCKDUCKGO_ENDPOINT")
}

fn searxng_endpoint_from_env() -> Option<String> {
    env("WEBBRIEF_SEARXNG_ENDPOINT")
}

fn apply_timeout(rb: reqwest::RequestBuilder, q: &SearchQuery) -> reqwest::RequestBuilder {
    match q.timeout_ms {
        Some(ms) => rb.timeout(std::time::Duration::from_millis(ms)),
        None => rb,
    }
}

/// Build the provider named on the command line (or `WEBBRIEF_SEARCH_PROVIDER`).
pub fn provider_from_name(name: &str, client: reqwest::Client) -> Result<Box<dyn SearchProvider>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "duckduckgo" | "ddg" => Ok(Box::new(DuckDuckGoSearchProvider::from_env(client))),
        "searxng" => Ok(Box::new(SearxngSearchProvider::from_env(client)?)),
        other => Err(Error::NotSupported(format!(
            "unknown search provider {other:?} (expected one of: {})",
            PROVIDER_NAMES.join(", ")
        ))),
    }
}

/// Keyless search over DuckDuckGo's HTML results page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearchProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearchProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Self {
        let endpoint =
            duckduckgo_endpoint_from_env().unwrap_or_else(|| DUCKDUCKGO_HTML_ENDPOINT.to_string());
        Self::new(client, endpoint)
    }

    fn region(q: &SearchQuery) -> String {
        match (q.country.as_deref(), q.language.as_deref()) {
            (Some(c), Some(l)) => format!("{}-{}", c.to_ascii_lowercase(), l.to_ascii_lowercase()),
            _ => DEFAULT_REGION.to_string(),
        }
    }
}

/// Resolve a result anchor's href to the target page.
///
/// DuckDuckGo wraps organic results in `/l/?uddg=<target>` redirects and ads in
/// `/y.js`; anything still pointing at duckduckgo.com after unwrapping is dropped.
fn resolve_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };
    let mut url = url::Url::parse(&absolute).ok()?;
    let is_ddg = |u: &url::Url| {
        u.host_str()
            .map(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
            .unwrap_or(false)
    };
    if is_ddg(&url) && url.path().starts_with("/l/") {
        let target = url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())?;
        url = url::Url::parse(&target).ok()?;
    }
    if is_ddg(&url) || !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    Some(url.to_string())
}

fn element_text(el: &ElementRef) -> Option<String> {
    let s = el.text().collect::<String>();
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    (!s.is_empty()).then_some(s)
}

fn parse_duckduckgo_html(html: &str, max_results: usize) -> Vec<SearchResult> {
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let doc = Html::parse_document(html);
    let mut out: Vec<SearchResult> = Vec::new();
    for result in doc.select(&result_sel) {
        if out.len() >= max_results {
            break;
        }
        if result.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_result_href) else {
            continue;
        };
        if out.iter().any(|r| r.url == url) {
            continue;
        }
        out.push(SearchResult {
            url,
            title: element_text(&link),
            snippet: result.select(&snippet_sel).next().and_then(|s| element_text(&s)),
            source: "duckduckgo".to_string(),
        });
    }
    out
}

#[async_trait::async_trait]
impl SearchProvider for DuckDuckGoSearchProvider {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let max_results = result_limit(q);
        let region = Self::region(q);

        let rb = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("q", q.query.as_str()), ("kl", region.as_str())]);
        let resp = apply_timeout(rb, q)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        // 202 is how DuckDuckGo answers suspected bots: a challenge page, no results.
        if !status.is_success() || status == reqwest::StatusCode::ACCEPTED {
            return Err(Error::Search(format!("duckduckgo search HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| Error::Search(e.to_string()))?;
        let results = parse_duckduckgo_html(&body, max_results);
        tracing::debug!(
            query = %q.query,
            region = %region,
            results = results.len(),
            "duckduckgo search completed"
        );

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());
        Ok(SearchResponse {
            results,
            provider: "duckduckgo".to_string(),
            timings_ms,
        })
    }
}

/// Search through a self-hosted SearXNG instance (JSON API).
#[derive(Debug, Clone)]
pub struct SearxngSearchProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl SearxngSearchProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let endpoint = searxng_endpoint_from_env().ok_or_else(|| {
            Error::NotConfigured("missing WEBBRIEF_SEARXNG_ENDPOINT".to_string())
        })?;
        Ok(Self::new(client, endpoint))
    }

    fn endpoint_search(&self) -> String {
        // Accept either a base URL or a full /search endpoint.
        let mut base = self.endpoint.trim().trim_end_matches('/').to_string();
        if !base.ends_with("/search") {
            base.push_str("/search");
        }
        base
    }
}

#[derive(Debug, Deserialize)]
struct SearxngSearchResponse {
    results: Option<Vec<SearxngResult>>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for SearxngSearchProvider {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let max_results = result_limit(q);

        let mut rb = self
            .client
            .get(self.endpoint_search())
            .query(&[("q", q.query.as_str()), ("format", "json")]);
        if let Some(lang) = q.language.as_deref() {
            rb = rb.query(&[("language", lang)]);
        }
        let resp = apply_timeout(rb, q)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("searxng search HTTP {status}")));
        }
        let parsed: SearxngSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut results = Vec::new();
        for r in parsed.results.unwrap_or_default() {
            if results.len() >= max_results {
                break;
            }
            let Some(url) = r.url.filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            results.push(SearchResult {
                url,
                title: r.title,
                snippet: r.content,
                source: "searxng".to_string(),
            });
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());
        Ok(SearchResponse {
            results,
            provider: "searxng".to_string(),
            timings_ms,
        })
    }
}
