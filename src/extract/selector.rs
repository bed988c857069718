//! CSS selector extraction.

use std::time::Duration;

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Lookup;
use crate::browser::{LivePage, Presence};
use crate::error::{Result, ScrapeError};

/// Extracted values keyed by label, in request order.
pub type ExtractedValues = IndexMap<String, String>;

/// A CSS selector with the label its value is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    /// Read this attribute instead of the element text.
    #[serde(default, alias = "attr", skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
}

impl SelectorSpec {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            label: None,
            attribute: None,
        }
    }

    pub fn labeled(label: &str, selector: &str) -> Self {
        Self::new(selector).with_label(label)
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Label for results; falls back to the selector text.
    pub fn label(&self) -> &str {
        match self.label.as_deref() {
            Some(l) if !l.is_empty() => l,
            _ => &self.selector,
        }
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Parse the CSS selector.
    pub fn compile(&self) -> Result<CompiledSelector> {
        if self.selector.trim().is_empty() {
            return Err(ScrapeError::malformed("selector must not be empty"));
        }
        let parsed = Selector::parse(&self.selector).map_err(|e| {
            ScrapeError::malformed(format!("invalid CSS selector '{}': {}", self.selector, e))
        })?;
        Ok(CompiledSelector {
            spec: self.clone(),
            parsed,
        })
    }
}

/// A [`SelectorSpec`] whose CSS has been parsed.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    spec: SelectorSpec,
    parsed: Selector,
}

impl CompiledSelector {
    pub fn spec(&self) -> &SelectorSpec {
        &self.spec
    }

    /// Look up the first matching element in `doc`.
    pub fn lookup(&self, doc: &Html) -> Lookup {
        match doc.select(&self.parsed).next() {
            Some(el) => Lookup::Found(self.read(el)),
            None => Lookup::NotFound,
        }
    }

    fn read(&self, el: ElementRef<'_>) -> String {
        match self.spec.attribute() {
            Some(attr) => el.value().attr(attr).unwrap_or_default().to_string(),
            None => element_text(el),
        }
    }
}

/// Trimmed text content of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Compile every spec, failing on the first invalid selector.
pub fn compile_all(specs: &[SelectorSpec]) -> Result<Vec<CompiledSelector>> {
    specs.iter().map(SelectorSpec::compile).collect()
}

/// Resolve selectors against a static HTML snapshot.
///
/// Specs are applied in order; a repeated label keeps its first position and
/// takes the last value.
pub fn resolve_html(html: &str, selectors: &[CompiledSelector]) -> ExtractedValues {
    let doc = Html::parse_document(html);
    let mut values = ExtractedValues::with_capacity(selectors.len());

    for compiled in selectors {
        let lookup = compiled.lookup(&doc);
        if lookup.is_not_found() {
            debug!("No match for selector {}", compiled.spec().selector());
        }
        values.insert(
            compiled.spec().label().to_string(),
            lookup.into_value_or_empty(),
        );
    }

    values
}

/// Resolve selectors against a live page.
///
/// Each selector gets a bounded, non-fatal wait before a single content
/// snapshot is taken and parsed.
pub async fn resolve_live(
    page: &dyn LivePage,
    selectors: &[CompiledSelector],
    wait: Duration,
) -> Result<ExtractedValues> {
    for compiled in selectors {
        let presence = page.wait_for_selector(compiled.spec().selector(), wait).await;
        if presence == Presence::Missing {
            debug!(
                "Selector {} not present on {}",
                compiled.spec().selector(),
                page.url()
            );
        }
    }

    let html = page.content().await?;
    Ok(resolve_html(&html, selectors))
}
