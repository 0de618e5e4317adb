//! Top-level run: session, then traversal.

use crate::auth::Authenticator;
use crate::config::ScraperConfig;
use crate::error::{DriverError, Result, ScrapeError};
use crate::pagination::{PaginationEngine, TraversalReport};
use crate::session::SessionStore;
use crate::sink::RecordSink;
use crate::traits::driver::{BrowserDriver, Page};
use crate::types::Session;

/// Composes the session store, the login flow and the pagination engine.
///
/// This is the only place that decides whether a fresh login is needed.
pub struct Orchestrator<D: BrowserDriver> {
    driver: D,
    config: ScraperConfig,
    store: SessionStore,
}

impl<D: BrowserDriver> Orchestrator<D> {
    pub fn new(driver: D, config: ScraperConfig) -> Self {
        let store = SessionStore::new(config.session_path.clone());
        Self {
            driver,
            config,
            store,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_parts(self) -> (D, ScraperConfig) {
        (self.driver, self.config)
    }

    /// Scrape from the configured start URL.
    pub async fn run(&self) -> Result<TraversalReport> {
        self.run_from(&self.config.start_url).await
    }

    pub async fn run_from(&self, start_url: &str) -> Result<TraversalReport> {
        tracing::info!(
            driver = self.driver.name(),
            start_url = %start_url,
            output = %self.config.output_path.display(),
            "Starting scrape run"
        );

        // Header presence is decided by whether the file exists now.
        let mut sink = RecordSink::open(&self.config.output_path);

        let session = self.establish_session().await?;
        let context = self.driver.new_context(&session).await?;
        let page = context.new_page().await?;
        open_start_page(page.as_ref(), start_url).await?;

        PaginationEngine::new()
            .with_retry(self.config.retry)
            .with_max_pages(self.config.max_pages)
            .run(page.as_ref(), start_url, &mut sink)
            .await
    }

    async fn establish_session(&self) -> Result<Session> {
        if self.store.exists() {
            match self.store.load() {
                Ok(session) => {
                    tracing::info!(path = %self.store.path().display(), "Reusing stored session");
                    return Ok(session);
                }
                Err(ScrapeError::CorruptSession { path, reason }) => {
                    tracing::warn!(
                        path = %path.display(),
                        reason = %reason,
                        "Stored session is unreadable, discarding and logging in again"
                    );
                    self.store.discard()?;
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::info!("No stored session, logging in");
        }

        self.login().await?;
        // Contexts are always built from what is on disk.
        self.store.load()
    }

    async fn login(&self) -> Result<()> {
        let credentials = self.config.credentials.clone().ok_or_else(|| {
            ScrapeError::Config("EMAIL and PASSWORD are required to log in".to_string())
        })?;

        let page = self.driver.new_page().await?;
        page.goto(&self.config.login_url).await?;
        page.wait_for_ready().await?;

        Authenticator::new(credentials)
            .with_settle_delay(self.config.settle_delay)
            .login(page.as_ref(), &self.store)
            .await?;
        Ok(())
    }
}

async fn open_start_page(page: &dyn Page, start_url: &str) -> Result<()> {
    let failed = |e: DriverError| ScrapeError::FetchFailed {
        url: start_url.to_string(),
        reason: format!("start page never became ready: {}", e),
    };
    page.goto(start_url).await.map_err(failed)?;
    page.wait_for_ready().await.map_err(failed)
}
