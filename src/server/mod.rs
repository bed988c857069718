//! HTTP API for page rendering and extraction.
//!
//! Endpoints:
//! - `POST /crawl`: rendered HTML, markdown and title
//! - `POST /screenshot`: full-page PNG, base64 encoded
//! - `POST /selectors`: caller-supplied CSS selectors
//! - `POST /precios`: store-routed price extraction, single or batched
//! - `POST /extract`: LLM structured extraction over page markdown

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::browser::{ChromeDriver, PageDriver};
use crate::config::ServiceConfig;
use crate::llm::LlmClient;
use crate::pipeline::{Orchestrator, PipelineSettings};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub llm: Arc<LlmClient>,
}

impl AppState {
    pub fn new(driver: Arc<dyn PageDriver>, config: &ServiceConfig) -> anyhow::Result<Self> {
        let router = config.build_router()?;
        let orchestrator = Orchestrator::new(
            driver,
            Arc::new(router),
            PipelineSettings::from_config(config),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            llm: Arc::new(LlmClient::new(config.llm.clone())),
        })
    }
}

/// Start the web server. The browser is launched on first use and shut
/// down after the server stops.
pub async fn serve(config: &ServiceConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let driver = Arc::new(ChromeDriver::new(config.browser.clone()));
    let state = AppState::new(driver.clone(), config)?;
    tracing::info!(
        "Loaded {} store profiles ({:?} matching)",
        state.orchestrator.router().profiles().len(),
        state.orchestrator.router().mode()
    );
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    driver.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
