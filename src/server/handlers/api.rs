//! Service status handlers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Service banner.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Storefront scraper running",
    }))
}

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}
