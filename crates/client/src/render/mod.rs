//! Headless browser rendering for JS-heavy pages.
//!
//! [`BrowserLauncher`] starts a browser once; the returned [`Renderer`] is
//! shared by every page fetch of an engine. The chromiumoxide-backed
//! implementation lives behind the `render` feature.

pub mod guard;

#[cfg(feature = "render")]
mod chromium;

#[cfg(feature = "render")]
pub use chromium::{ChromiumLauncher, HeadlessRenderer};
pub use guard::{GuardError, check_navigable};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Rendering was compiled out or disabled by configuration.
    #[error("browser rendering unavailable")]
    Unavailable,

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Page load timeout.
    pub timeout: Duration,

    /// Extra wait after load for client-side rendering to finish.
    pub settle: Duration,

    /// Viewport dimensions (default: 1280x720).
    pub viewport: (u32, u32),

    /// Write a full-page PNG here when set.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            viewport: (1280, 720),
            screenshot_dir: None,
        }
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Rendered HTML content.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    pub screenshot: Option<PathBuf>,

    pub render_time_ms: u64,
}

/// Renders one URL to HTML in a running browser.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

/// Starts a browser and hands back a renderer bound to it.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Renderer>, RenderError>;
}

/// Launcher used when rendering is disabled; every launch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLauncher;

#[async_trait::async_trait]
impl BrowserLauncher for DisabledLauncher {
    async fn launch(&self) -> Result<Arc<dyn Renderer>, RenderError> {
        Err(RenderError::Unavailable)
    }
}

/// File name for a page screenshot: millisecond timestamp plus a
/// filesystem-safe rendering of the host and path.
pub fn screenshot_file_name(url: &Url, now_ms: i64) -> String {
    let raw = format!("{}{}", url.host_str().unwrap_or("page"), url.path());
    let mut slug: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    slug.truncate(80);
    let slug = slug.trim_matches('_');
    format!("{now_ms}-{slug}.png")
}
