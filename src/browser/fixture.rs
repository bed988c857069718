//! In-memory page driver for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{LivePage, PageDriver, Presence, WaitUntil};
use crate::error::{Result, ScrapeError};

/// Canned behavior for one URL.
#[derive(Debug, Clone)]
pub enum FixturePage {
    Html(String),
    NavigationError(String),
    Timeout,
    /// Allocates a page, then never finishes navigating. The page is released
    /// once the navigation timeout passed to `open` runs out.
    Hang,
}

impl FixturePage {
    pub fn html(body: &str) -> Self {
        Self::Html(format!("<html><head></head><body>{}</body></html>", body))
    }
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    waits: Mutex<Vec<String>>,
    wait_modes: Mutex<Vec<WaitUntil>>,
}

/// Driver serving static HTML keyed by exact URL.
#[derive(Clone, Default)]
pub struct FixtureDriver {
    pages: HashMap<String, FixturePage>,
    counters: Arc<Counters>,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: FixturePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Selectors waited on, in call order.
    pub fn waited_selectors(&self) -> Vec<String> {
        self.counters.waits.lock().unwrap().clone()
    }

    /// Wait conditions requested, in call order.
    pub fn wait_modes(&self) -> Vec<WaitUntil> {
        self.counters.wait_modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageDriver for FixtureDriver {
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn LivePage>> {
        self.counters.wait_modes.lock().unwrap().push(wait_until);

        match self.pages.get(url) {
            Some(FixturePage::Html(html)) => {
                self.counters.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FixtureLivePage {
                    url: url.to_string(),
                    html: html.clone(),
                    counters: self.counters.clone(),
                }))
            }
            Some(FixturePage::NavigationError(msg)) => Err(ScrapeError::navigation(url, msg)),
            Some(FixturePage::Timeout) => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            Some(FixturePage::Hang) => {
                self.counters.opened.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(timeout).await;
                self.counters.closed.fetch_add(1, Ordering::SeqCst);
                Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            None => Err(ScrapeError::navigation(url, "net::ERR_NAME_NOT_RESOLVED")),
        }
    }
}

struct FixtureLivePage {
    url: String,
    html: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl LivePage for FixtureLivePage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Presence {
        self.counters
            .waits
            .lock()
            .unwrap()
            .push(selector.to_string());

        let Ok(parsed) = Selector::parse(selector) else {
            return Presence::Missing;
        };
        let doc = Html::parse_document(&self.html);
        if doc.select(&parsed).next().is_some() {
            Presence::Found
        } else {
            Presence::Missing
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
    }

    async fn close(&self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
