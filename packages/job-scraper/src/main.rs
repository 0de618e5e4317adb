// Entry point for the job scraper

use anyhow::{Context, Result};
use job_scraper::{drivers::ChromiumDriver, Orchestrator, ScraperConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_scraper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScraperConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        start_url = %config.start_url,
        session = %config.session_path.display(),
        output = %config.output_path.display(),
        "Configuration loaded"
    );

    let driver = ChromiumDriver::launch(&config)
        .await
        .context("Failed to launch Chrome")?;

    let orchestrator = Orchestrator::new(driver, config);
    let outcome = orchestrator.run().await;

    let (driver, config) = orchestrator.into_parts();
    if let Err(e) = driver.close().await {
        tracing::warn!(error = %e, "Failed to close Chrome cleanly");
    }

    let report = outcome.with_context(|| format!("Scrape from {} failed", config.start_url))?;
    tracing::info!(
        pages = report.pages,
        records = report.records,
        stop_reason = %report.stop_reason,
        "Done"
    );

    Ok(())
}
