//! Deep page fetches through the headless browser.

use sleuth_client::{BrowserLauncher, RenderOptions, Renderer, canonicalize, check_navigable, extract_text};
use sleuth_core::{AppConfig, CacheDb, CacheKey, PageContent, SearchResult};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Why a single page produced no content.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PageError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("navigation blocked: {0}")]
    Blocked(String),

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("page load timed out")]
    Timeout,

    /// Visible text was shorter than the configured minimum.
    #[error("extracted {chars} chars, need at least {min}")]
    TooShort { chars: usize, min: usize },

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// How many top-ranked urls are fetched.
    pub top_k: usize,
    pub page_timeout: Duration,
    pub settle: Duration,
    pub concurrency: usize,
    pub text_max_chars: usize,
    pub text_min_chars: usize,
    pub screenshot_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
}

impl From<&AppConfig> for AutomationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.automation_top_k,
            page_timeout: config.page_timeout(),
            settle: config.settle(),
            concurrency: config.page_concurrency,
            text_max_chars: config.page_text_max_chars,
            text_min_chars: config.page_text_min_chars,
            screenshot_dir: config.screenshot_dir.clone(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Fetches full page text for the highest-ranked urls.
///
/// The browser is launched on first use and reused afterwards. A failed
/// launch is remembered so later calls degrade immediately.
#[derive(Clone)]
pub struct BrowserAutomationEngine {
    launcher: Arc<dyn BrowserLauncher>,
    renderer: Arc<OnceCell<Result<Arc<dyn Renderer>, String>>>,
    db: CacheDb,
    config: AutomationConfig,
}

impl BrowserAutomationEngine {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, db: CacheDb, config: AutomationConfig) -> Self {
        Self { launcher, renderer: Arc::new(OnceCell::new()), db, config }
    }

    /// Distinct urls of the `top_k` best-ranked results, leaving out hosts
    /// that recently failed to render.
    ///
    /// Ties on rank keep their incoming order.
    pub async fn select_targets(&self, results: &[SearchResult]) -> Vec<String> {
        let mut ranked: Vec<&SearchResult> = results.iter().collect();
        ranked.sort_by_key(|r| r.rank);

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for result in ranked {
            if targets.len() >= self.config.top_k {
                break;
            }
            let Ok(canonical) = canonicalize(&result.url) else {
                continue;
            };
            if !seen.insert(canonical.to_string()) {
                continue;
            }
            let failed = match canonical.host_str() {
                Some(host) => self.host_failed(host).await,
                None => false,
            };
            if failed {
                tracing::debug!(url = %canonical, "host failed to render recently; skipped");
                continue;
            }
            targets.push(result.url.clone());
        }
        targets
    }

    async fn host_failed(&self, host: &str) -> bool {
        match self.db.get(&CacheKey::domain(host)).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(host, error = %e, "domain cache read failed");
                false
            }
        }
    }

    /// Remember `host` for the cache ttl and hand `error` back.
    async fn mark_failed(&self, host: Option<&str>, error: PageError) -> PageError {
        let Some(host) = host else {
            return error;
        };
        match self.db.put(&CacheKey::domain(host), &error.to_string(), self.config.cache_ttl).await {
            Ok(()) => tracing::info!(host, error = %error, "host marked as failing to render"),
            Err(e) => tracing::warn!(host, error = %e, "domain cache write failed"),
        }
        error
    }

    async fn renderer(&self) -> Result<Arc<dyn Renderer>, PageError> {
        let launched = self
            .renderer
            .get_or_init(|| async {
                match self.launcher.launch().await {
                    Ok(renderer) => Ok(renderer),
                    Err(e) => {
                        tracing::warn!(error = %e, "browser launch failed; automation disabled");
                        Err(e.to_string())
                    }
                }
            })
            .await;

        launched.clone().map_err(PageError::BrowserUnavailable)
    }

    /// Fetch one page, serving a fresh cached copy when present.
    pub async fn fetch(&self, url: &str) -> Result<PageContent, PageError> {
        let canonical = canonicalize(url).map_err(|e| PageError::InvalidUrl(e.to_string()))?;
        let key = CacheKey::page(canonical.as_str());

        match self.db.get_json::<PageContent>(&key).await {
            Ok(Some(page)) => {
                tracing::debug!(url = %canonical, "page cache hit");
                return Ok(page);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %canonical, error = %e, "page cache read failed"),
        }

        check_navigable(&canonical).map_err(|e| PageError::Blocked(e.to_string()))?;

        let renderer = self.renderer().await?;
        let opts = RenderOptions {
            timeout: self.config.page_timeout,
            settle: self.config.settle,
            screenshot_dir: self.config.screenshot_dir.clone(),
            ..Default::default()
        };

        let start = Instant::now();
        let deadline = self.config.page_timeout + self.config.settle;
        let host = canonical.host_str();
        let rendered = match tokio::time::timeout(deadline, renderer.render(&canonical, &opts)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return Err(self.mark_failed(host, PageError::Render(e.to_string())).await),
            Err(_) => return Err(self.mark_failed(host, PageError::Timeout).await),
        };

        let extracted = extract_text(&rendered.html, self.config.text_max_chars);
        let chars = extracted.char_count();
        if chars < self.config.text_min_chars {
            let error = PageError::TooShort { chars, min: self.config.text_min_chars };
            return Err(self.mark_failed(host, error).await);
        }

        let page = PageContent {
            url: canonical.to_string(),
            title: extracted.title,
            text: extracted.text,
            screenshot: rendered.screenshot,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(url = %canonical, chars, elapsed_ms = start.elapsed().as_millis() as u64, "page fetched");

        if let Err(e) = self.db.put_json(&key, &page, self.config.cache_ttl).await {
            tracing::warn!(url = %canonical, error = %e, "page cache write failed");
        }

        Ok(page)
    }

    /// Fetch `urls` concurrently. Failures are logged and skipped; pages
    /// come back in `urls` order.
    pub async fn fetch_all(&self, urls: &[String], cancel: &CancellationToken) -> Vec<PageContent> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, url) in urls.iter().cloned().enumerate() {
            let engine = self.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (idx, url, Err(PageError::Cancelled));
                };
                let result = engine.fetch(&url).await;
                (idx, url, result)
            });
        }

        let mut pages = Vec::new();
        loop {
            tokio::select! {
                biased;
                next = join_set.join_next() => match next {
                    Some(Ok((idx, _, Ok(page)))) => pages.push((idx, page)),
                    Some(Ok((_, url, Err(e)))) => tracing::warn!(url = %url, error = %e, "page fetch failed"),
                    Some(Err(e)) => tracing::error!(error = %e, "page task panicked"),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    tracing::warn!(pending = join_set.len(), "budget elapsed during automation");
                    join_set.abort_all();
                    break;
                }
            }
        }

        pages.sort_by_key(|(idx, _)| *idx);
        pages.into_iter().map(|(_, page)| page).collect()
    }

    /// Cached pages for `urls` without navigating. Misses are skipped.
    pub async fn cached_pages(&self, urls: &[String]) -> Vec<PageContent> {
        let mut pages = Vec::new();
        for url in urls {
            let Ok(canonical) = canonicalize(url) else {
                continue;
            };
            match self.db.get_json::<PageContent>(&CacheKey::page(canonical.as_str())).await {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %canonical, error = %e, "page cache read failed"),
            }
        }
        pages
    }
}
