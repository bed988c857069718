//! Page rendering and selector extraction handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;

use super::super::AppState;
use super::types::{rejected, ResultadosResponse, ScreenshotResponse};
use crate::pipeline::{BatchRequest, ExtractionRequest};

/// Rendered HTML, markdown and title of a page.
pub async fn crawl(
    State(state): State<AppState>,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return rejected(e).into_response(),
    };

    match state.orchestrator.crawl(&req).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Full-page PNG screenshot, base64 encoded.
pub async fn screenshot(
    State(state): State<AppState>,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return rejected(e).into_response(),
    };

    match state.orchestrator.screenshot(&req).await {
        Ok(png) => Json(ScreenshotResponse {
            image_base64: base64::engine::general_purpose::STANDARD.encode(png),
            content_type: "image/png",
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Resolve caller-supplied selectors. Misses come back as empty strings.
pub async fn selectors(
    State(state): State<AppState>,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return rejected(e).into_response(),
    };

    match state.orchestrator.extract_selectors(&req).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Store-routed price extraction.
///
/// A single object answers with its result or an error status; arrays and
/// `{"urls": [...]}` answer with one entry per item, failures embedded.
pub async fn precios(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let batch = match body {
        Ok(Json(batch)) => batch,
        Err(e) => return rejected(e).into_response(),
    };

    match batch {
        BatchRequest::Single(req) => match state.orchestrator.run_item(&req).await {
            Ok(result) => Json(result).into_response(),
            Err(e) => e.into_response(),
        },
        BatchRequest::Many(items) => Json(state.orchestrator.run_batch(&items).await).into_response(),
        urls @ BatchRequest::Urls { .. } => {
            let items = urls.into_items();
            let resultados = state.orchestrator.run_batch(&items).await;
            Json(ResultadosResponse { resultados }).into_response()
        }
    }
}
