//! Labeled-row scanning for specification tables.
//!
//! Some storefronts render product details as repeated rows of
//! `header / value` pairs whose order changes between products. A
//! [`RowScanSpec`] finds the first row whose header contains a given phrase
//! and reads that row's value.

use std::time::Duration;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::selector::element_text;
use super::Lookup;
use crate::browser::{LivePage, Presence};
use crate::error::{Result, ScrapeError};

/// Configuration for one labeled-row scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowScanSpec {
    /// Label the scanned value is reported under.
    pub label: String,
    /// Selector matching each repeating row container.
    pub row_selector: String,
    /// Selector, relative to the row, for the header cell.
    pub header_selector: String,
    /// Selector, relative to the row, for the value cell.
    pub value_selector: String,
    /// Case-insensitive phrase the header must contain.
    pub header_match: String,
}

impl RowScanSpec {
    pub fn compile(&self) -> Result<CompiledRowScan> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| {
                ScrapeError::malformed(format!("invalid CSS selector '{}': {}", s, e))
            })
        };

        Ok(CompiledRowScan {
            rows: parse(&self.row_selector)?,
            header: parse(&self.header_selector)?,
            value: parse(&self.value_selector)?,
            needle: self.header_match.to_lowercase(),
            spec: self.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRowScan {
    spec: RowScanSpec,
    rows: Selector,
    header: Selector,
    value: Selector,
    needle: String,
}

impl CompiledRowScan {
    pub fn spec(&self) -> &RowScanSpec {
        &self.spec
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    /// Scan rows of a static snapshot in document order; first match wins.
    pub fn scan_html(&self, html: &str) -> Lookup {
        let doc = Html::parse_document(html);

        for row in doc.select(&self.rows) {
            let Some(header) = row.select(&self.header).next() else {
                continue;
            };
            if !element_text(header).to_lowercase().contains(&self.needle) {
                continue;
            }

            let value = row
                .select(&self.value)
                .next()
                .map(element_text)
                .unwrap_or_default();
            return Lookup::Found(value);
        }

        Lookup::NotFound
    }

    /// Wait (bounded) for a row container, then scan the page.
    ///
    /// Never fails: a timeout or unreadable page is reported as not found.
    pub async fn scan_live(&self, page: &dyn LivePage, wait: Duration) -> Lookup {
        if page.wait_for_selector(&self.spec.row_selector, wait).await == Presence::Missing {
            debug!(
                "No {} rows on {} for {}",
                self.spec.row_selector,
                page.url(),
                self.spec.label
            );
            return Lookup::NotFound;
        }

        match page.content().await {
            Ok(html) => self.scan_html(&html),
            Err(e) => {
                warn!("Row scan for {} skipped: {}", self.spec.label, e);
                Lookup::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::{FixtureDriver, FixturePage};
    use crate::browser::{PageDriver, WaitUntil};

    fn invima_scan() -> CompiledRowScan {
        RowScanSpec {
            label: "registro_invima".to_string(),
            row_selector: "div.spec-row".to_string(),
            header_selector: ".spec-name".to_string(),
            value_selector: ".spec-value".to_string(),
            header_match: "Registro".to_string(),
        }
        .compile()
        .unwrap()
    }

    const SPEC_TABLE: &str = r#"
        <div class="specs">
            <div class="spec-row"><span class="spec-name">Marca</span><span class="spec-value">Genfar</span></div>
            <div class="spec-row"><span class="spec-value">orphan</span></div>
            <div class="spec-row"><span class="spec-name">REGISTRO SANITARIO</span><span class="spec-value"> INVIMA 2019M-0001 </span></div>
            <div class="spec-row"><span class="spec-name">Registro anterior</span><span class="spec-value">OLD</span></div>
        </div>
    "#;

    #[test]
    fn test_first_matching_row_wins_case_insensitive() {
        assert_eq!(
            invima_scan().scan_html(SPEC_TABLE),
            Lookup::Found("INVIMA 2019M-0001".to_string())
        );
    }

    #[test]
    fn test_no_matching_row() {
        let html = r#"<div class="spec-row"><span class="spec-name">Marca</span><span class="spec-value">X</span></div>"#;
        assert_eq!(invima_scan().scan_html(html), Lookup::NotFound);
        assert_eq!(invima_scan().scan_html("<p>empty</p>"), Lookup::NotFound);
    }

    #[test]
    fn test_matching_row_without_value_is_empty() {
        let html = r#"<div class="spec-row"><span class="spec-name">Registro</span></div>"#;
        assert_eq!(invima_scan().scan_html(html), Lookup::Found(String::new()));
    }

    #[test]
    fn test_invalid_row_selector() {
        let spec = RowScanSpec {
            label: "x".to_string(),
            row_selector: "div[".to_string(),
            header_selector: "h".to_string(),
            value_selector: "v".to_string(),
            header_match: "x".to_string(),
        };
        assert!(spec.compile().is_err());
    }

    #[tokio::test]
    async fn test_scan_live_missing_rows_is_not_found() {
        let driver = FixtureDriver::new()
            .with_page("https://shop.test/empty", FixturePage::html("<p>nothing</p>"))
            .with_page("https://shop.test/full", FixturePage::html(SPEC_TABLE));

        let page = driver
            .open("https://shop.test/empty", WaitUntil::Load, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            invima_scan().scan_live(page.as_ref(), Duration::from_millis(10)).await,
            Lookup::NotFound
        );
        page.close().await;

        let page = driver
            .open("https://shop.test/full", WaitUntil::Load, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            invima_scan().scan_live(page.as_ref(), Duration::from_millis(10)).await,
            Lookup::Found("INVIMA 2019M-0001".to_string())
        );
        page.close().await;
    }
}
