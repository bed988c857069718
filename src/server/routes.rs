//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Page rendering
        .route("/crawl", post(handlers::crawl))
        .route("/screenshot", post(handlers::screenshot))
        // Extraction
        .route("/selectors", post(handlers::selectors))
        .route("/precios", post(handlers::precios))
        .route("/extract", post(handlers::extract))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
