//! DuckDuckGo HTML endpoint provider.
//!
//! Needs no API key. Scrapes the lite HTML results page and decodes the
//! `/l/?uddg=` redirect wrapper DuckDuckGo puts around result links.

use crate::provider::{ProviderError, SearchProvider, status_error};
use reqwest::header;
use scraper::{ElementRef, Html, Selector};
use sleuth_core::{AppConfig, SearchResult};
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo client configuration.
#[derive(Debug, Clone)]
pub struct DuckDuckGoConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: "sleuth/0.1".to_string(),
        }
    }
}

impl DuckDuckGoConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { timeout: config.provider_timeout(), user_agent: config.user_agent.clone(), ..Default::default() }
    }
}

/// Keyless search provider backed by DuckDuckGo's HTML results page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    http: reqwest::Client,
    config: DuckDuckGoConfig,
}

impl DuckDuckGoClient {
    pub fn new(config: DuckDuckGoConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl SearchProvider for DuckDuckGoClient {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        let start = Instant::now();
        tracing::debug!(query, "searching DuckDuckGo");

        let response = self
            .http
            .get(&self.config.base_url)
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(header::ACCEPT, "text/html")
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let html = response.text().await?;
        let results = parse_results(&html, limit);

        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, count = results.len(), "DuckDuckGo search completed");
        Ok(results)
    }
}

/// Parse a DuckDuckGo HTML results page.
///
/// Sponsored entries and results without a usable link are skipped. Ranks
/// start at 1 in page order.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) =
        (Selector::parse("div.result"), Selector::parse("a.result__a"), Selector::parse(".result__snippet"))
    else {
        return Vec::new();
    };

    let mut results = Vec::new();

    for block in document.select(&result_sel) {
        if results.len() >= limit {
            break;
        }

        if block.value().classes().any(|c| c == "result--ad") {
            continue;
        }

        let Some(link) = block.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(decode_redirect) else {
            continue;
        };

        let title = element_text(&link);
        let snippet = block.select(&snippet_sel).next().map(|s| element_text(&s)).unwrap_or_default();

        results.push(SearchResult {
            url,
            title,
            snippet,
            source: "duckduckgo".to_string(),
            rank: results.len() + 1,
        });
    }

    results
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unwrap `//duckduckgo.com/l/?uddg=<encoded>` links; pass direct links through.
fn decode_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") { format!("https:{href}") } else { href.to_string() };
    let parsed = Url::parse(&absolute).ok()?;

    if parsed.host_str().is_some_and(|h| h.ends_with("duckduckgo.com")) && parsed.path().starts_with("/l/") {
        let target = parsed.query_pairs().find(|(k, _)| k == "uddg").map(|(_, v)| v.into_owned())?;
        let target = Url::parse(&target).ok()?;
        return matches!(target.scheme(), "http" | "https").then(|| target.to_string());
    }

    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}
