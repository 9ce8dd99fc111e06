use super::{BrowserLauncher, RenderError, RenderOptions, RenderedPage, Renderer, screenshot_file_name};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::Page;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Instant as TokioInstant;
use url::Url;

/// Launches headless Chrome/Chromium through chromiumoxide.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    viewport: (u32, u32),
}

impl ChromiumLauncher {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self { viewport }
    }
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new((1280, 720))
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Renderer>, RenderError> {
        let renderer = HeadlessRenderer::new(self.viewport).await?;
        Ok(Arc::new(renderer))
    }
}

/// Headless Chrome/Chromium renderer using chromiumoxide.
pub struct HeadlessRenderer {
    browser: Browser,
}

impl HeadlessRenderer {
    /// Launch a headless browser.
    ///
    /// A background task drains the DevTools Protocol event stream for the
    /// lifetime of the browser.
    pub async fn new(viewport: (u32, u32)) -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .window_size(viewport.0, viewport.1)
            .build()
            .map_err(RenderError::BrowserLaunch)?;

        let (browser, mut handler) =
            Browser::launch(config).await.map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                    break;
                }
            }
        });

        tracing::info!("headless browser launched");
        Ok(Self { browser })
    }
}

/// Navigate an already open tab and collect its content.
async fn load(page: &Page, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
    let start = Instant::now();

    page.goto(url.as_str()).await.map_err(|e| RenderError::Navigation(e.to_string()))?;

    tokio::time::sleep(opts.settle).await;

    let html = page.content().await.map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;

    let page_url = page.url().await.map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;
    let final_url = page_url.as_deref().and_then(|u| Url::parse(u).ok()).unwrap_or_else(|| url.clone());

    let screenshot = match &opts.screenshot_dir {
        Some(dir) => {
            let path = dir.join(screenshot_file_name(&final_url, chrono::Utc::now().timestamp_millis()));
            let params = ScreenshotParams::builder().format(CaptureScreenshotFormat::Png).full_page(true).build();
            match page.save_screenshot(params, &path).await {
                Ok(_) => Some(path),
                Err(e) => {
                    tracing::warn!(url = %final_url, error = %e, "screenshot failed");
                    None
                }
            }
        }
        None => None,
    };

    Ok(RenderedPage { html, final_url, screenshot, render_time_ms: start.elapsed().as_millis() as u64 })
}

/// Closes a tab exactly once: explicitly through [`TabGuard::close`], or
/// from a spawned task when the render future is dropped mid-navigation.
struct TabGuard<F>
where
    F: Future<Output = ()> + Send + 'static,
{
    close: Option<F>,
}

impl<F> TabGuard<F>
where
    F: Future<Output = ()> + Send + 'static,
{
    fn new(close: F) -> Self {
        Self { close: Some(close) }
    }

    async fn close(mut self) {
        if let Some(close) = self.close.take() {
            close.await;
        }
    }
}

impl<F> Drop for TabGuard<F>
where
    F: Future<Output = ()> + Send + 'static,
{
    fn drop(&mut self) {
        let Some(close) = self.close.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close);
            }
            Err(_) => tracing::debug!("no runtime to close abandoned tab"),
        }
    }
}

#[async_trait::async_trait]
impl Renderer for HeadlessRenderer {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let timeout_ms = opts.timeout.as_millis() as u64;
        let deadline = TokioInstant::now() + opts.timeout;

        // The tab opens blank so that a hanging navigation still leaves a
        // handle to close.
        let page = tokio::time::timeout_at(deadline, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| RenderError::Timeout(timeout_ms))?
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let tab = page.clone();
        let target = url.to_string();
        let guard = TabGuard::new(async move {
            if let Err(e) = tab.close().await {
                tracing::debug!(url = %target, error = %e, "closing tab failed");
            }
        });

        let outcome = tokio::time::timeout_at(deadline, load(&page, url, opts)).await;
        guard.close().await;
        outcome.map_err(|_| RenderError::Timeout(timeout_ms))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn close_flag() -> (Arc<AtomicUsize>, impl Future<Output = ()> + Send + 'static) {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        (closes, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_tab_closed_once_on_normal_path() {
        let (closes, close) = close_flag();
        let guard = TabGuard::new(close);

        guard.close().await;
        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tab_closed_when_render_times_out() {
        let (closes, close) = close_flag();
        let render = async move {
            let _guard = TabGuard::new(close);
            std::future::pending::<()>().await;
        };

        let timed = tokio::time::timeout(Duration::from_millis(20), render).await;
        assert!(timed.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tab_closed_when_render_task_aborted() {
        let (closes, close) = close_flag();
        let task = tokio::spawn(async move {
            let _guard = TabGuard::new(close);
            std::future::pending::<()>().await;
        });

        tokio::task::yield_now().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_launcher_starts_browser() {
        assert!(ChromiumLauncher::default().launch().await.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_render_simple_page() {
        let renderer = ChromiumLauncher::default().launch().await.unwrap();
        let url = Url::parse("https://example.com").unwrap();
        let dir = std::env::temp_dir();
        let opts = RenderOptions { screenshot_dir: Some(dir), ..Default::default() };

        let page = renderer.render(&url, &opts).await.unwrap();
        assert!(page.html.contains("Example Domain"));
        assert_eq!(page.final_url.as_str(), "https://example.com/");
        assert!(page.screenshot.is_some_and(|p| p.exists()));
    }
}
