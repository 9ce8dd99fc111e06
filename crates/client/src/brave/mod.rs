//! Brave Search API client.
//!
//! Provides a client for the Brave Web Search API with rate limiting,
//! request validation, and response normalization.
//!
//! - **Endpoint**: `https://api.search.brave.com/res/v1/web/search`
//! - **Authentication**: Uses `X-Subscription-Token` header.
//! - **Rate Limiting**: 1s minimum interval between requests (free tier).
//! - **Normalization**: Converts Brave's response into `sleuth_core::SearchResult`.

pub mod error;
pub mod request;
pub mod response;

pub use error::BraveError;
pub use request::{SafeSearch, SearchRequest};

use crate::provider::{ProviderError, SearchProvider};
use reqwest::header;
use sleuth_core::{AppConfig, SearchResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default base URL for Brave Search API.
const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "sleuth/0.1";

/// Minimum interval between requests for rate limiting (1 second for free tier).
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Brave API client configuration.
#[derive(Debug, Clone)]
pub struct BraveConfig {
    /// API key from SLEUTH_BRAVE_API_KEY.
    pub api_key: String,
    /// Base URL (default: https://api.search.brave.com/res/v1).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for BraveConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl BraveConfig {
    /// Build from application config. Fails when no API key is configured.
    pub fn from_app(config: &AppConfig) -> Result<Self, BraveError> {
        let api_key = config.require_brave_api_key().map_err(|_| BraveError::MissingApiKey)?;

        Ok(Self {
            api_key: api_key.to_string(),
            timeout: config.provider_timeout(),
            user_agent: config.user_agent.clone(),
            ..Default::default()
        })
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// Brave Search API client.
#[derive(Debug, Clone)]
pub struct BraveClient {
    http: reqwest::Client,
    config: BraveConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl BraveClient {
    /// Create a new Brave client with the given configuration.
    pub fn new(config: BraveConfig) -> Result<Self, BraveError> {
        if config.api_key.is_empty() {
            return Err(BraveError::MissingApiKey);
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { http, config, rate_limiter: Arc::new(RateLimiter::new(MIN_REQUEST_INTERVAL)) })
    }

    /// Execute a web search query and normalize the hits.
    pub async fn web_search(&self, req: SearchRequest) -> Result<Vec<SearchResult>, BraveError> {
        req.validate()?;

        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/web/search", self.config.base_url);

        tracing::debug!(query = %req.q, "searching Brave API");

        let http_response = self
            .http
            .get(&url)
            .header("X-Subscription-Token", &self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&req)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(%status, "Brave API response");

        if status == 401 || status == 403 {
            return Err(BraveError::AuthError);
        }

        if status == 429 {
            return Err(BraveError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(BraveError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let api_response: response::BraveApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| BraveError::Parse(e.to_string()))?;

        let results = api_response.into_results(req.get_count() as usize);
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, count = results.len(), "search completed");

        Ok(results)
    }
}

#[async_trait::async_trait]
impl SearchProvider for BraveClient {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        let mut results = self.web_search(SearchRequest::for_query(query, limit)).await?;
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_missing_key() {
        let config = AppConfig::default();
        assert!(matches!(BraveConfig::from_app(&config), Err(BraveError::MissingApiKey)));
    }

    #[test]
    fn test_config_from_app() {
        let config = AppConfig { brave_api_key: Some("k".into()), provider_timeout_ms: 2500, ..Default::default() };
        let brave = BraveConfig::from_app(&config).unwrap();
        assert_eq!(brave.api_key, "k");
        assert_eq!(brave.timeout, Duration::from_millis(2500));
        assert_eq!(brave.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_new_missing_key() {
        let config = BraveConfig::default();
        let result = BraveClient::new(config);
        assert!(matches!(result, Err(BraveError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_invalid_query_rejected_before_network() {
        let client = BraveClient::new(BraveConfig {
            api_key: "k".into(),
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        let err = client.search("   ", 5).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
