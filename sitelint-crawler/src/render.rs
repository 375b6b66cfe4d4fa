use crate::error::{CrawlError, Result};
use crate::extract;
use crate::result::{PageRecord, RenderedData};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Delay after network settles so late DOM mutations land.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Hybrid,
    Always,
    Never,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Hybrid => "hybrid",
            RenderMode::Always => "always",
            RenderMode::Never => "never",
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(RenderMode::Hybrid),
            "always" => Ok(RenderMode::Always),
            "never" => Ok(RenderMode::Never),
            other => Err(format!("unknown render mode: {}", other)),
        }
    }
}

/// The hybrid-rendering trigger: render only when the static HTML
/// looks incomplete, meaning thin text or no title and no h1 at all.
pub fn should_render(
    word_count: usize,
    has_title: bool,
    has_h1: bool,
    min_word_threshold: usize,
) -> bool {
    word_count < min_word_threshold || (!has_title && !has_h1)
}

/// Pick the URLs worth rendering, capped at the render budget. Only
/// successful HTML pages are ever candidates.
pub fn select_render_candidates(
    pages: &[PageRecord],
    mode: RenderMode,
    min_word_threshold: usize,
    max_render_pages: usize,
) -> Vec<String> {
    let mut candidates: Vec<String> = pages
        .iter()
        .filter(|p| p.is_success() && p.extracted.is_some())
        .filter(|p| match mode {
            RenderMode::Never => false,
            RenderMode::Always => true,
            RenderMode::Hybrid => {
                let extracted = p.extracted.as_ref().unwrap();
                should_render(
                    extracted.word_count,
                    extracted.title.is_some(),
                    extracted.h1_count > 0,
                    min_word_threshold,
                )
            }
        })
        .map(|p| p.url.clone())
        .collect();

    candidates.truncate(max_render_pages);
    candidates
}

/// Drives a headless Chromium instance. One browser per run, one tab
/// per rendered page, a small semaphore keeping concurrency apart
/// from the fetch pool's budget.
pub struct Renderer {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl Renderer {
    pub async fn launch(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(CrawlError::RenderError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::RenderError(format!("browser launch failed: {}", e)))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!("Headless browser launched");

        Ok(Self {
            browser: Arc::new(browser),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Load one URL, wait for navigation plus a settle delay, and
    /// re-extract the signal tuple from the live DOM.
    pub async fn render_page(&self, url: &str) -> Result<RenderedData> {
        let page = tokio::time::timeout(self.timeout, self.browser.new_page(url))
            .await
            .map_err(|_| CrawlError::RenderError(format!("navigation timeout for {}", url)))?
            .map_err(|e| CrawlError::RenderError(format!("failed to open {}: {}", url, e)))?;

        let _ = tokio::time::timeout(self.timeout, page.wait_for_navigation()).await;
        tokio::time::sleep(SETTLE_DELAY).await;

        let html = tokio::time::timeout(self.timeout, page.content())
            .await
            .map_err(|_| CrawlError::RenderError(format!("content timeout for {}", url)))?
            .map_err(|e| CrawlError::RenderError(format!("failed to read DOM of {}: {}", url, e)))?;

        if let Err(e) = page.close().await {
            debug!("Page close error for {}: {}", url, e);
        }

        Ok(extract::extract_rendered(&html))
    }

    /// Render a batch of URLs with bounded concurrency. A page that
    /// fails to render is simply absent from the result map; the
    /// caller falls back to its static data.
    pub async fn render_all(
        &self,
        urls: Vec<String>,
        concurrency: usize,
    ) -> HashMap<String, RenderedData> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let results = futures::stream::iter(urls)
            .map(|url| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.ok()?;
                    match self.render_page(&url).await {
                        Ok(rendered) => Some((url, rendered)),
                        Err(e) => {
                            warn!("Render failed, keeping static data: {}", e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        results.into_iter().flatten().collect()
    }

    pub async fn shutdown(self) {
        if let Ok(mut browser) = Arc::try_unwrap(self.browser)
            && let Err(e) = browser.close().await
        {
            warn!("Browser close error: {}", e);
        }
    }
}
