//! One-off price extraction from the command line.

use std::sync::Arc;

use console::style;

use crate::browser::{ChromeDriver, WaitUntil};
use crate::config::ServiceConfig;
use crate::pipeline::{ExtractionRequest, Orchestrator, PipelineSettings};

/// Run a batch over `urls` and print the results as JSON.
pub async fn cmd_precios(
    config: &ServiceConfig,
    urls: &[String],
    wait_until: Option<WaitUntil>,
) -> anyhow::Result<()> {
    let router = config.build_router()?;
    let driver = Arc::new(ChromeDriver::new(config.browser.clone()));
    let orchestrator = Orchestrator::new(
        driver.clone(),
        Arc::new(router),
        PipelineSettings::from_config(config),
    );

    let items: Vec<ExtractionRequest> = urls
        .iter()
        .map(|url| {
            let req = ExtractionRequest::new(url);
            match wait_until {
                Some(w) => req.with_wait_until(w),
                None => req,
            }
        })
        .collect();

    let results = orchestrator.run_batch(&items).await;
    driver.close().await;

    let failed = results.iter().filter(|r| r.is_error()).count();
    println!("{}", serde_json::to_string_pretty(&results)?);
    if failed > 0 {
        eprintln!(
            "{} {} of {} URLs failed",
            style("!").yellow(),
            failed,
            results.len()
        );
    }

    Ok(())
}
