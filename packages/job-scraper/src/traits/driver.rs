//! Browser driver boundary.
//!
//! The scraper never renders pages or inspects markup itself. Everything it
//! needs from a browser goes through these traits:
//!
//! - [`BrowserDriver`] opens pages and restores browsing contexts from a
//!   stored [`Session`]
//! - [`Page`] navigates, waits for readiness, and answers semantic queries
//! - [`Element`] is a located control that can be filled or clicked
//!
//! Implementations:
//! - `drivers::ChromiumDriver` - Chrome over CDP (requires `chromium` feature)
//! - `testing::FakeSite` - scripted in-memory site for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_scraper::query::shapes;
//!
//! let context = driver.new_context(&session).await?;
//! let page = context.new_page().await?;
//! page.goto("https://www.idealist.org/jobs").await?;
//! page.wait_for_ready().await?;
//!
//! let data = page.query_data(&shapes::job_posts()).await?;
//! let controls = page.query_elements(&shapes::pagination()).await?;
//! if let Some(next) = controls.get(shapes::NEXT_PAGE_BUTTON) {
//!     next.click().await?;
//! }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DriverResult;
use crate::query::QueryShape;
use crate::types::Session;

/// A located, interactive element.
#[async_trait]
pub trait Element: Send + Sync {
    /// Replace the element's value with `text`.
    async fn fill(&self, text: &str) -> DriverResult<()>;

    async fn click(&self) -> DriverResult<()>;
}

/// Elements returned by [`Page::query_elements`], keyed by dotted shape path.
///
/// A path missing from the set means the driver could not locate that part
/// of the shape on the page.
#[derive(Default)]
pub struct ElementSet {
    elements: HashMap<String, Box<dyn Element>>,
}

impl ElementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, element: Box<dyn Element>) {
        self.elements.insert(path.into(), element);
    }

    pub fn get(&self, path: &str) -> Option<&dyn Element> {
        self.elements.get(path).map(|e| e.as_ref())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.elements.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Located paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// A single browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url`.
    async fn goto(&self, url: &str) -> DriverResult<()>;

    /// Block until the current document reports ready state.
    ///
    /// Any timeout is the driver's own; expiry is reported as
    /// `DriverError::ReadyTimeout`.
    async fn wait_for_ready(&self) -> DriverResult<()>;

    /// Canonical URL of the current document.
    async fn current_url(&self) -> DriverResult<String>;

    /// Extract data matching `shape` as JSON shaped like the query.
    async fn query_data(&self, shape: &QueryShape) -> DriverResult<serde_json::Value>;

    /// Locate the controls named by `shape`'s leaves.
    async fn query_elements(&self, shape: &QueryShape) -> DriverResult<ElementSet>;

    /// Capture the authenticated state of this page's browsing context.
    async fn storage_state(&self) -> DriverResult<Session>;
}

/// A browsing context restored from a stored session.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> DriverResult<Box<dyn Page>>;
}

/// Factory for pages and contexts.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a page in a fresh context with no stored state (used for login).
    async fn new_page(&self) -> DriverResult<Box<dyn Page>>;

    /// Open a context that carries `session`'s authenticated state.
    async fn new_context(&self, session: &Session) -> DriverResult<Box<dyn BrowserContext>>;

    /// Driver name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
