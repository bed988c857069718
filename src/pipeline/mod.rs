//! Extraction requests and the batch orchestrator.
//!
//! Every unit of work opens its own isolated page, runs under the per-item
//! deadline, and closes the page on every exit path. Batch items run one at a
//! time against the shared driver; one item's failure is recorded in its own
//! result and never aborts the rest of the batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::browser::{self, LivePage, PageDriver, WaitUntil};
use crate::config::ServiceConfig;
use crate::error::{Result, ScrapeError};
use crate::extract::selector::{compile_all, resolve_live};
use crate::extract::{CompiledRowScan, CompiledSelector, ExtractedValues, SelectorSpec};
use crate::stores::StoreRouter;

/// One page to extract from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub url: String,
    #[serde(
        default,
        rename = "waitUntil",
        alias = "wait_until",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_until: Option<WaitUntil>,
    /// Explicit selectors. When empty, store-routed requests use the profile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorSpec>,
}

impl ExtractionRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            wait_until: None,
            selectors: Vec::new(),
        }
    }

    pub fn with_selectors(mut self, selectors: Vec<SelectorSpec>) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = Some(wait_until);
        self
    }

    /// Require an absolute http(s) URL.
    pub fn validate_url(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ScrapeError::malformed("url is required"));
        }
        let parsed = Url::parse(&self.url)
            .map_err(|e| ScrapeError::malformed(format!("invalid url '{}': {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ScrapeError::malformed(format!(
                "unsupported url scheme '{}'",
                other
            ))),
        }
    }
}

/// Values extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub results: ExtractedValues,
    /// Set when the item failed; `results` is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn failed(url: &str, err: &ScrapeError) -> Self {
        Self {
            url: url.to_string(),
            results: ExtractedValues::new(),
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Accepted input shapes for store-routed extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BatchRequest {
    Many(Vec<ExtractionRequest>),
    /// `{"urls": [...]}`, answered as `{"resultados": [...]}`.
    Urls { urls: Vec<String> },
    Single(ExtractionRequest),
}

impl BatchRequest {
    pub fn into_items(self) -> Vec<ExtractionRequest> {
        match self {
            Self::Many(items) => items,
            Self::Urls { urls } => urls.iter().map(|u| ExtractionRequest::new(u)).collect(),
            Self::Single(item) => vec![item],
        }
    }
}

/// Rendered page content.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutput {
    pub url: String,
    pub title: String,
    pub markdown: String,
    pub html: String,
}

/// Timeouts and load conditions used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub item_deadline: Duration,
    pub default_wait_until: WaitUntil,
    pub precios_wait_until: WaitUntil,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            selector_timeout: config.selector_timeout(),
            item_deadline: config.item_deadline(),
            default_wait_until: config.default_wait_until,
            precios_wait_until: config.precios_wait_until,
        }
    }
}

/// Runs extraction requests against a shared page driver.
#[derive(Clone)]
pub struct Orchestrator {
    driver: Arc<dyn PageDriver>,
    router: Arc<StoreRouter>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        router: Arc<StoreRouter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            driver,
            router,
            settings,
        }
    }

    pub fn router(&self) -> &StoreRouter {
        &self.router
    }

    /// Rendered HTML, markdown and title for one page.
    pub async fn crawl(&self, req: &ExtractionRequest) -> Result<CrawlOutput> {
        req.validate_url()?;
        let wait = req.wait_until.unwrap_or(self.settings.default_wait_until);
        let html = browser::fetch_rendered_html(
            self.driver.as_ref(),
            &req.url,
            wait,
            self.settings.navigation_timeout,
        )
        .await?;

        Ok(CrawlOutput {
            url: req.url.clone(),
            title: crate::extract::page_title(&html),
            markdown: crate::extract::html_to_markdown(&html),
            html,
        })
    }

    /// Full-page PNG of one page.
    pub async fn screenshot(&self, req: &ExtractionRequest) -> Result<Vec<u8>> {
        req.validate_url()?;
        let wait = req.wait_until.unwrap_or(self.settings.default_wait_until);
        browser::capture_screenshot(
            self.driver.as_ref(),
            &req.url,
            wait,
            self.settings.navigation_timeout,
        )
        .await
    }

    /// Resolve the request's own selectors against its page.
    pub async fn extract_selectors(&self, req: &ExtractionRequest) -> Result<ExtractionResult> {
        req.validate_url()?;
        if req.selectors.is_empty() {
            return Err(ScrapeError::malformed("selectors must not be empty"));
        }
        let selectors = compile_all(&req.selectors)?;
        let wait = req.wait_until.unwrap_or(self.settings.default_wait_until);

        self.extract_page(&req.url, wait, &selectors, None).await
    }

    /// Extract one store-routed item. Explicit selectors bypass the router.
    pub async fn run_item(&self, req: &ExtractionRequest) -> Result<ExtractionResult> {
        req.validate_url()?;
        let wait = req.wait_until.unwrap_or(self.settings.precios_wait_until);

        if !req.selectors.is_empty() {
            let selectors = compile_all(&req.selectors)?;
            return self.extract_page(&req.url, wait, &selectors, None).await;
        }

        let profile = self.router.resolve(&req.url)?;
        info!("Routing {} to store profile {}", req.url, profile.token());
        self.extract_page(&req.url, wait, profile.selectors(), profile.row_scan())
            .await
    }

    /// Run items in order; each failure is captured in that item's result.
    pub async fn run_batch(&self, items: &[ExtractionRequest]) -> Vec<ExtractionResult> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (i, item) in items.iter().enumerate() {
            info!("[{}/{}] Extracting {}", i + 1, total, item.url);
            let result = match self.run_item(item).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("[{}/{}] {} failed: {}", i + 1, total, item.url, e);
                    ExtractionResult::failed(&item.url, &e)
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!("Batch complete: {} ok, {} failed", total - failed, failed);
        results
    }

    /// Open an isolated page, resolve selectors and the optional row scan,
    /// then close the page. The whole unit is bounded by the item deadline.
    ///
    /// `open` is never cancelled from here: it gets the smaller of the
    /// navigation timeout and the deadline, and releases its own page when
    /// that runs out.
    async fn extract_page(
        &self,
        url: &str,
        wait_until: WaitUntil,
        selectors: &[CompiledSelector],
        row_scan: Option<&CompiledRowScan>,
    ) -> Result<ExtractionResult> {
        let deadline = self.settings.item_deadline;
        let started = Instant::now();

        let open_timeout = self.settings.navigation_timeout.min(deadline);
        let page = self.driver.open(url, wait_until, open_timeout).await?;

        let remaining = deadline.saturating_sub(started.elapsed());
        let outcome = tokio::time::timeout(
            remaining,
            self.resolve_on_page(page.as_ref(), selectors, row_scan),
        )
        .await;
        page.close().await;

        let results = outcome.map_err(|_| deadline_exceeded(url, deadline))??;
        Ok(ExtractionResult {
            url: url.to_string(),
            results,
            error: None,
        })
    }

    async fn resolve_on_page(
        &self,
        page: &dyn LivePage,
        selectors: &[CompiledSelector],
        row_scan: Option<&CompiledRowScan>,
    ) -> Result<ExtractedValues> {
        let wait = self.settings.selector_timeout;
        let mut values = resolve_live(page, selectors, wait).await?;

        if let Some(scan) = row_scan {
            let value = scan.scan_live(page, wait).await.into_value_or_empty();
            values.insert(scan.label().to_string(), value);
        }

        Ok(values)
    }
}

fn deadline_exceeded(url: &str, deadline: Duration) -> ScrapeError {
    ScrapeError::NavigationTimeout {
        url: url.to_string(),
        timeout_ms: deadline.as_millis() as u64,
    }
}
