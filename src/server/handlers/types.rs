//! Request and response bodies shared by handlers.

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::browser::WaitUntil;
use crate::error::ScrapeError;
use crate::pipeline::ExtractionResult;

/// Error body: `{"error": "..."}` with the status of the failure.
impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::debug!("Rejected request: {}", self);
        } else {
            tracing::warn!("Request failed: {}", self);
        }
        let status = self.status_code();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Turn a body rejection into a client error.
pub fn rejected(rejection: JsonRejection) -> ScrapeError {
    ScrapeError::malformed(rejection.body_text())
}

#[derive(Debug, Serialize)]
pub struct ScreenshotResponse {
    pub image_base64: String,
    pub content_type: &'static str,
}

/// Legacy batch answer for `{"urls": [...]}` requests.
#[derive(Debug, Serialize)]
pub struct ResultadosResponse {
    pub resultados: Vec<ExtractionResult>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, rename = "waitUntil", alias = "wait_until")]
    pub wait_until: Option<WaitUntil>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractResponse {
    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            raw_text: String::new(),
            error: Some(error.to_string()),
        }
    }
}
