//! Headless browser access.
//!
//! Pages are reached through the [`PageDriver`] / [`LivePage`] pair so the
//! extraction pipeline never talks to CDP directly. The production driver is
//! [`ChromeDriver`] (chromiumoxide); tests use an in-memory fixture driver.

mod chrome;
mod config;
#[cfg(test)]
pub(crate) mod fixture;

pub use chrome::ChromeDriver;
pub use config::BrowserEngineConfig;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Load condition a navigation must reach before the page is considered ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The window `load` event has fired.
    Load,
    /// The DOM has been parsed; late-rendered content may be missing.
    #[default]
    #[serde(alias = "domContentLoaded", alias = "dom_content_loaded")]
    DomContentLoaded,
    /// No new network requests for a short quiet window after load.
    #[serde(alias = "networkIdle", alias = "network_idle")]
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitUntil {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "load" => Ok(Self::Load),
            "domcontentloaded" => Ok(Self::DomContentLoaded),
            "networkidle" => Ok(Self::NetworkIdle),
            other => Err(format!(
                "unknown wait condition '{}' (expected load, domcontentloaded or networkidle)",
                other
            )),
        }
    }
}

/// Outcome of a bounded wait for a selector on a live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Found,
    Missing,
}

/// A rendered page owned by one unit of work.
///
/// Callers must invoke [`LivePage::close`] when done, including on error paths.
#[async_trait]
pub trait LivePage: Send + Sync {
    /// URL the page was opened for.
    fn url(&self) -> &str;

    /// Wait up to `timeout` for `selector` to match at least one element.
    /// Never fails; a timeout or driver error reports [`Presence::Missing`].
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Presence;

    /// Serialized DOM of the page as it is now.
    async fn content(&self) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot_png(&self) -> Result<Vec<u8>>;

    /// Close the page and release its isolated browsing context.
    async fn close(&self);
}

/// Opens isolated pages in a shared browser process.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate a fresh, isolated page to `url` and wait for `wait_until`.
    ///
    /// Fails with `NavigationTimeout` when the whole navigation exceeds
    /// `timeout`, or `Navigation` for DNS/connection failures.
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn LivePage>>;
}

/// Fetch the serialized DOM of `url` after `wait_until` is satisfied.
pub async fn fetch_rendered_html(
    driver: &dyn PageDriver,
    url: &str,
    wait_until: WaitUntil,
    timeout: Duration,
) -> Result<String> {
    let page = driver.open(url, wait_until, timeout).await?;
    let result = page.content().await;
    page.close().await;
    if let Ok(ref html) = result {
        debug!("Fetched {} bytes from {}", html.len(), url);
    }
    result
}

/// Capture a full-page PNG of `url`.
pub async fn capture_screenshot(
    driver: &dyn PageDriver,
    url: &str,
    wait_until: WaitUntil,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let page = driver.open(url, wait_until, timeout).await?;
    let result = page.screenshot_png().await;
    page.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::fixture::{FixtureDriver, FixturePage};
    use super::*;
    use crate::error::ScrapeError;

    #[test]
    fn test_wait_until_parse() {
        assert_eq!("load".parse::<WaitUntil>().unwrap(), WaitUntil::Load);
        assert_eq!(
            "domContentLoaded".parse::<WaitUntil>().unwrap(),
            WaitUntil::DomContentLoaded
        );
        assert_eq!(
            "network_idle".parse::<WaitUntil>().unwrap(),
            WaitUntil::NetworkIdle
        );
        assert!("commit".parse::<WaitUntil>().is_err());
    }

    #[test]
    fn test_wait_until_serde() {
        let w: WaitUntil = serde_json::from_str("\"networkidle\"").unwrap();
        assert_eq!(w, WaitUntil::NetworkIdle);
        let w: WaitUntil = serde_json::from_str("\"networkIdle\"").unwrap();
        assert_eq!(w, WaitUntil::NetworkIdle);
        let w: WaitUntil = serde_json::from_str("\"domContentLoaded\"").unwrap();
        assert_eq!(w, WaitUntil::DomContentLoaded);
        assert_eq!(WaitUntil::default(), WaitUntil::DomContentLoaded);
        assert_eq!(serde_json::to_string(&WaitUntil::Load).unwrap(), "\"load\"");
    }

    #[tokio::test]
    async fn test_fetch_rendered_html_closes_page() {
        let driver = FixtureDriver::new()
            .with_page("https://shop.test/a", FixturePage::html("<p>hi</p>"));

        let html = fetch_rendered_html(
            &driver,
            "https://shop.test/a",
            WaitUntil::Load,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(html.contains("<p>hi</p>"));
        assert_eq!(driver.opened(), 1);
        assert_eq!(driver.closed(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rendered_html_navigation_failure() {
        let driver = FixtureDriver::new().with_page(
            "https://down.test/",
            FixturePage::NavigationError("net::ERR_NAME_NOT_RESOLVED".to_string()),
        );

        let err = fetch_rendered_html(
            &driver,
            "https://down.test/",
            WaitUntil::Load,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(driver.closed(), 0);
    }
}
