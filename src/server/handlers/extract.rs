//! LLM structured extraction handler.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::warn;

use super::super::AppState;
use super::types::{ExtractRequest, ExtractResponse};
use crate::error::ScrapeError;
use crate::pipeline::ExtractionRequest;

/// Render a page, convert it to markdown and ask the model for structured
/// data. Always answers 200; failures set `success: false`.
pub async fn extract(
    State(state): State<AppState>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Json<ExtractResponse> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return Json(ExtractResponse::failed(e.body_text())),
    };

    match run_extract(&state, &req).await {
        Ok(response) => Json(response),
        Err(e) => {
            warn!("Extraction failed for {}: {}", req.url, e);
            Json(ExtractResponse::failed(e))
        }
    }
}

async fn run_extract(state: &AppState, req: &ExtractRequest) -> Result<ExtractResponse, ScrapeError> {
    let page_req = ExtractionRequest {
        url: req.url.clone(),
        wait_until: req.wait_until,
        selectors: Vec::new(),
    };
    let page = state.orchestrator.crawl(&page_req).await?;
    let extraction = state.llm.extract(&page.markdown, req.query.as_deref()).await?;

    Ok(ExtractResponse {
        success: true,
        data: extraction.data,
        raw_text: extraction.raw_text,
        error: None,
    })
}
