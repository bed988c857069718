//! Content extraction from rendered pages.

pub mod markdown;
pub mod rows;
pub mod selector;

pub use markdown::{html_to_markdown, page_title};
pub use rows::{CompiledRowScan, RowScanSpec};
pub use selector::{CompiledSelector, ExtractedValues, SelectorSpec};

/// Result of looking up one value in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
}

impl Lookup {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Coerce a miss into an empty string. Misses are expected outcomes and
    /// are never surfaced as errors.
    pub fn into_value_or_empty(self) -> String {
        match self {
            Self::Found(value) => value,
            Self::NotFound => String::new(),
        }
    }
}
