//! Error types for page fetching and extraction.

use axum::http::StatusCode;
use thiserror::Error;

use crate::llm::LlmError;

/// Failures that abort a single extraction unit.
///
/// A selector that matches nothing is not represented here: lookups yield
/// [`crate::extract::Lookup::NotFound`], which callers coerce into an empty
/// string.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Navigation timed out after {timeout_ms}ms for {url}")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Unsupported store: no profile registered for {url}")]
    UnsupportedStore { url: String },

    #[error("Extraction client error: {0}")]
    ExtractionClient(#[from] LlmError),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

impl ScrapeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    pub fn navigation(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Navigation {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// HTTP status for this failure: client faults are 400, timeouts 504.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedStore { .. } | Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::NavigationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Navigation { .. } | Self::ExtractionClient(_) | Self::Browser(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
