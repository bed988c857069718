//! chromiumoxide (CDP) page driver.
//!
//! One browser process is shared by every request. Each `open` creates a
//! fresh browser context (separate cookies and storage) holding one page, and
//! `close` disposes both.

#[cfg(feature = "browser")]
use std::path::{Path, PathBuf};
#[cfg(feature = "browser")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "browser")]
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "browser")]
use std::time::Instant;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
#[cfg(feature = "browser")]
use chromiumoxide::page::ScreenshotParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::config::BrowserEngineConfig;
use super::{LivePage, PageDriver, WaitUntil};
#[cfg(feature = "browser")]
use super::Presence;
use crate::error::{Result, ScrapeError};

/// Resolves once the DOM has been parsed.
#[cfg(feature = "browser")]
const DOM_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

/// Resolves once the window load event has fired.
#[cfg(feature = "browser")]
const LOAD_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState));
        }
    })
"#;

#[cfg(feature = "browser")]
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// How long the resource count must stay unchanged to call the network idle.
#[cfg(feature = "browser")]
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

#[cfg(feature = "browser")]
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(feature = "browser")]
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[cfg(feature = "browser")]
type SharedBrowser = Arc<Mutex<Option<Browser>>>;

#[cfg(feature = "browser")]
fn browser_err(context: &str, e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Browser(format!("{}: {}", context, e))
}

/// Page driver backed by a headless Chrome/Chromium process.
#[cfg(feature = "browser")]
pub struct ChromeDriver {
    config: BrowserEngineConfig,
    browser: SharedBrowser,
}

#[cfg(feature = "browser")]
impl ChromeDriver {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Create a driver. The browser is started lazily on first use.
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    /// Find a Chrome executable on disk or in PATH.
    fn find_chrome() -> Result<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(ScrapeError::Browser(
            "Chrome/Chromium not found. Install chromium or set BROWSER_URL to a remote DevTools endpoint"
                .to_string(),
        ))
    }

    /// Launch a local browser process.
    async fn launch(&self) -> Result<Browser> {
        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| browser_err("Failed to build browser config", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_err("Failed to launch browser", e))?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Connect to a remote Chrome instance via its /json/version endpoint.
    async fn connect_remote(&self, url: &str) -> Result<Browser> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| browser_err("Failed to connect to remote browser", e))?
            .json()
            .await
            .map_err(|e| browser_err("Failed to parse browser version info", e))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::Browser("No webSocketDebuggerUrl in response".to_string()))?;

        info!("Connecting to WebSocket: {}", ws_url);

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| browser_err("Failed to connect to remote browser", e))?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Create a page inside a fresh browser context, starting the browser if needed.
    async fn new_isolated_page(&self) -> Result<(Page, BrowserContextId)> {
        let mut guard = self.browser.lock().await;

        if guard.is_none() {
            let browser = match self.config.remote_url.clone() {
                Some(remote) => self.connect_remote(&remote).await?,
                None => self.launch().await?,
            };
            *guard = Some(browser);
        }

        let browser = guard
            .as_mut()
            .ok_or_else(|| ScrapeError::Browser("browser not initialized".to_string()))?;

        let context_id = match browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Connection is likely gone; relaunch on the next request.
                *guard = None;
                return Err(browser_err("Failed to create browser context", e));
            }
        };

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| browser_err("Invalid target params", e))?;

        match browser.new_page(params).await {
            Ok(page) => Ok((page, context_id)),
            Err(e) => {
                let _ = browser.dispose_browser_context(context_id).await;
                Err(browser_err("Failed to open page", e))
            }
        }
    }

    /// Shut down the shared browser.
    pub async fn close(&self) {
        *self.browser.lock().await = None;
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageDriver for ChromeDriver {
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn LivePage>> {
        let (page, context_id) = self.new_isolated_page().await?;
        let live = ChromePage {
            url: url.to_string(),
            page,
            context_id,
            browser: self.browser.clone(),
            released: AtomicBool::new(false),
        };

        if let Err(e) = live
            .page
            .execute(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
            .await
        {
            debug!("User agent override failed: {}", e);
        }

        let navigation = navigate(&live.page, url, wait_until);
        let outcome = match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(()) => Ok(Box::new(live)),
            Err(e) => {
                live.close().await;
                Err(e)
            }
        }
    }
}

/// Navigate and wait for the requested load condition.
#[cfg(feature = "browser")]
async fn navigate(page: &Page, url: &str, wait_until: WaitUntil) -> Result<()> {
    info!("Navigating to {} (wait_until={})", url, wait_until);

    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| ScrapeError::malformed(format!("Invalid URL: {}", e)))?;

    let response = page
        .execute(nav_params)
        .await
        .map_err(|e| ScrapeError::navigation(url, e))?;

    // DNS and connection failures are reported here, not as CDP errors
    if let Some(ref error_text) = response.result.error_text {
        return Err(ScrapeError::navigation(url, error_text));
    }

    match wait_until {
        WaitUntil::DomContentLoaded => wait_for_script(page, DOM_READY_SCRIPT).await,
        WaitUntil::Load => wait_for_script(page, LOAD_SCRIPT).await,
        WaitUntil::NetworkIdle => {
            wait_for_script(page, LOAD_SCRIPT).await;
            wait_for_network_idle(page).await;
        }
    }

    Ok(())
}

#[cfg(feature = "browser")]
async fn wait_for_script(page: &Page, script: &str) {
    match page.evaluate(script.to_string()).await {
        Ok(result) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Err(e) => {
            debug!("Could not check ready state (possibly non-HTML page): {}", e);
        }
    }
}

/// Poll the resource timeline until it stops growing for the quiet window.
#[cfg(feature = "browser")]
async fn wait_for_network_idle(page: &Page) {
    let mut last_count: i64 = -1;
    let mut stable_since = Instant::now();

    loop {
        let count = match page.evaluate(RESOURCE_COUNT_SCRIPT.to_string()).await {
            Ok(result) => result.into_value::<i64>().unwrap_or(last_count),
            Err(e) => {
                debug!("Resource timeline unavailable: {}", e);
                return;
            }
        };

        if count != last_count {
            last_count = count;
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= NETWORK_QUIET_WINDOW {
            debug!("Network idle after {} resources", count);
            return;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A page and its browser context.
///
/// Released by `close`, or from `Drop` on a spawned task when the owning
/// future was cancelled first.
#[cfg(feature = "browser")]
struct ChromePage {
    url: String,
    page: Page,
    context_id: BrowserContextId,
    browser: SharedBrowser,
    released: AtomicBool,
}

#[cfg(feature = "browser")]
impl Drop for ChromePage {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to release page for {}", self.url);
            return;
        };
        debug!("Releasing abandoned page for {}", self.url);
        handle.spawn(release_page(
            self.url.clone(),
            self.page.clone(),
            self.context_id.clone(),
            self.browser.clone(),
        ));
    }
}

/// Close the page, then dispose its browser context.
#[cfg(feature = "browser")]
async fn release_page(
    url: String,
    page: Page,
    context_id: BrowserContextId,
    browser: SharedBrowser,
) {
    if let Err(e) = page.close().await {
        debug!("Page close failed for {}: {}", url, e);
    }

    let mut guard = browser.lock().await;
    if let Some(browser) = guard.as_mut() {
        if let Err(e) = browser.dispose_browser_context(context_id).await {
            debug!("Browser context disposal failed: {}", e);
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl LivePage for ChromePage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Presence {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return Presence::Found;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(presence) => presence,
            Err(_) => {
                warn!("Timeout waiting for selector {} on {}", selector, self.url);
                Presence::Missing
            }
        }
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| browser_err("Failed to read page content", e))
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| browser_err("Screenshot failed", e))
    }

    async fn close(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        release_page(
            self.url.clone(),
            self.page.clone(),
            self.context_id.clone(),
            self.browser.clone(),
        )
        .await;
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromeDriver {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromeDriver {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub async fn close(&self) {}
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageDriver for ChromeDriver {
    async fn open(
        &self,
        _url: &str,
        _wait_until: WaitUntil,
        _timeout: Duration,
    ) -> Result<Box<dyn LivePage>> {
        Err(ScrapeError::Browser(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}
