//! SearXNG JSON API provider.

use crate::provider::{ProviderError, SearchProvider, status_error};
use reqwest::header;
use serde::Deserialize;
use sleuth_core::{AppConfig, SearchResult};
use std::time::Duration;

/// SearXNG client configuration.
#[derive(Debug, Clone)]
pub struct SearxngConfig {
    /// Instance root, e.g. `http://localhost:8888`.
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl SearxngConfig {
    /// `None` when no instance is configured.
    pub fn from_app(config: &AppConfig) -> Option<Self> {
        let base_url = config.searxng_url.as_deref()?.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        Some(Self {
            base_url: base_url.to_string(),
            timeout: config.provider_timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngHit>,
}

#[derive(Debug, Deserialize)]
struct SearxngHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

/// Search provider for a self-hosted SearXNG instance.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    http: reqwest::Client,
    config: SearxngConfig,
}

impl SearxngClient {
    pub fn new(config: SearxngConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl SearchProvider for SearxngClient {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        let url = format!("{}/search", self.config.base_url);
        tracing::debug!(query, instance = %self.config.base_url, "searching SearXNG");

        let response = self
            .http
            .get(&url)
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(header::ACCEPT, "application/json")
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let bytes = response.bytes().await?;
        parse_response(&bytes, limit)
    }
}

fn parse_response(body: &[u8], limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
    let parsed: SearxngResponse = serde_json::from_slice(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(parsed
        .results
        .into_iter()
        .filter(|h| !h.url.is_empty())
        .take(limit)
        .enumerate()
        .map(|(idx, h)| SearchResult {
            url: h.url,
            title: h.title.trim().to_string(),
            snippet: h.content.trim().to_string(),
            source: "searxng".to_string(),
            rank: idx + 1,
        })
        .collect())
}
