//! Chrome over the DevTools protocol.
//!
//! Navigation, readiness and clicks go through `chromiumoxide`. Data queries
//! send the rendered page to the AgentQL service. Element queries resolve each
//! leaf of the shape through a small table of CSS selectors keyed by the
//! leaf's name.

use agentql_client::AgentQlClient;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::ScraperConfig;
use crate::error::{DriverError, DriverResult, Result, ScrapeError};
use crate::query::QueryShape;
use crate::traits::driver::{BrowserContext, BrowserDriver, Element, ElementSet, Page};
use crate::types::Session;

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const BLANK_PAGE: &str = "about:blank";

/// CSS selectors tried, in order, for each control the scraper clicks or fills.
const ELEMENT_HINTS: &[(&str, &[&str])] = &[
    (
        "email_input",
        &["input[type='email']", "input[name='email']", "input[autocomplete='username']"],
    ),
    (
        "continue_btn",
        &["form button[type='submit']", "button[data-qa-id='continue-button']"],
    ),
    (
        "verify_not_robot_checkbox",
        &["input[type='checkbox'][name*='robot']", "form input[type='checkbox']"],
    ),
    (
        "password_input",
        &["input[type='password']", "input[name='password']"],
    ),
    (
        "next_page_btn",
        &[
            "a[rel='next']",
            "[aria-label='Next page']",
            "button[data-qa-id='pagination-next']",
        ],
    ),
];

fn selectors_for(leaf_path: &str) -> &'static [&'static str] {
    let name = leaf_path.rsplit('.').next().unwrap_or(leaf_path);
    ELEMENT_HINTS
        .iter()
        .find(|(hint, _)| *hint == name)
        .map(|(_, selectors)| *selectors)
        .unwrap_or(&[])
}

fn browser_err(e: CdpError) -> DriverError {
    DriverError::Browser(Box::new(e))
}

/// Cookie as stored in the session artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    /// Seconds since the epoch; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<f64>,
}

impl From<&Cookie> for StoredCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            expires: (!cookie.session).then_some(cookie.expires),
        }
    }
}

impl StoredCookie {
    fn into_param(self) -> CookieParam {
        let mut param = CookieParam::new(self.name, self.value);
        param.domain = Some(self.domain);
        param.path = Some(self.path);
        param.secure = Some(self.secure);
        param.http_only = Some(self.http_only);
        param.expires = self.expires.map(TimeSinceEpoch::new);
        param
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    cookies: Vec<StoredCookie>,
}

/// Browser driver backed by a locally launched Chrome.
pub struct ChromiumDriver {
    browser: Browser,
    handler_task: JoinHandle<()>,
    client: Arc<AgentQlClient>,
}

impl ChromiumDriver {
    /// Launch Chrome (headed unless `config.headless`).
    ///
    /// Requires `config.query_api_key`.
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let api_key = config.query_api_key.as_ref().ok_or_else(|| {
            ScrapeError::Config("AGENTQL_API_KEY is required for the Chromium driver".to_string())
        })?;
        let client = Arc::new(AgentQlClient::new(api_key.expose().to_string()));

        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| DriverError::Browser(e.into()))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(browser_err)?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("chromiumoxide handler event error: {}", e);
                }
            }
        });

        tracing::info!(headless = config.headless, "Chrome launched");

        Ok(Self {
            browser,
            handler_task,
            client,
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn close(mut self) -> DriverResult<()> {
        self.browser.close().await.map_err(browser_err)?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }

    async fn open_tab(&self) -> DriverResult<ChromiumPage> {
        let page = self
            .browser
            .new_page(BLANK_PAGE)
            .await
            .map_err(browser_err)?;
        Ok(ChromiumPage {
            page,
            client: Arc::clone(&self.client),
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn new_page(&self) -> DriverResult<Box<dyn Page>> {
        Ok(Box::new(self.open_tab().await?))
    }

    async fn new_context(&self, session: &Session) -> DriverResult<Box<dyn BrowserContext>> {
        let state: StoredState = serde_json::from_value(session.state().clone())
            .map_err(|e| DriverError::SessionState(e.to_string()))?;

        let cookies: Vec<CookieParam> = state
            .cookies
            .into_iter()
            .map(StoredCookie::into_param)
            .collect();

        tracing::debug!(cookies = cookies.len(), "Restoring browsing context");

        Ok(Box::new(ChromiumContext {
            tab: tokio::sync::Mutex::new(Some(self.open_tab().await?)),
            cookies,
        }))
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// A tab pre-loaded with the stored cookies.
///
/// The first page handed out is the tab the cookies were installed on;
/// later pages reuse the browser's shared cookie jar.
struct ChromiumContext {
    tab: tokio::sync::Mutex<Option<ChromiumPage>>,
    cookies: Vec<CookieParam>,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_page(&self) -> DriverResult<Box<dyn Page>> {
        let tab = self
            .tab
            .lock()
            .await
            .take()
            .ok_or_else(|| DriverError::SessionState("context already handed out its page".to_string()))?;

        if !self.cookies.is_empty() {
            tab.page
                .set_cookies(self.cookies.clone())
                .await
                .map_err(browser_err)?;
        }
        Ok(Box::new(tab))
    }
}

struct ChromiumPage {
    page: chromiumoxide::Page,
    client: Arc<AgentQlClient>,
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_ready(&self) -> DriverResult<()> {
        match tokio::time::timeout(READY_TIMEOUT, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(browser_err(e)),
            Err(_) => Err(DriverError::ReadyTimeout),
        }
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.page
            .url()
            .await
            .map_err(browser_err)?
            .ok_or_else(|| DriverError::Query("page has no URL".to_string()))
    }

    async fn query_data(&self, shape: &QueryShape) -> DriverResult<serde_json::Value> {
        let html = self.page.content().await.map_err(browser_err)?;
        tracing::debug!(
            query = shape.root_name(),
            html_bytes = html.len(),
            "Sending page to query service"
        );
        self.client
            .query_html(&shape.to_string(), &html)
            .await
            .map_err(|e| DriverError::Query(e.to_string()))
    }

    async fn query_elements(&self, shape: &QueryShape) -> DriverResult<ElementSet> {
        let mut elements = ElementSet::new();
        for path in shape.leaf_paths() {
            for selector in selectors_for(&path) {
                if let Ok(element) = self.page.find_element(*selector).await {
                    elements.insert(path.clone(), Box::new(ChromiumElement { element }));
                    break;
                }
            }
        }
        tracing::debug!(
            query = shape.root_name(),
            located = ?elements.paths(),
            "Located elements"
        );
        Ok(elements)
    }

    async fn storage_state(&self) -> DriverResult<Session> {
        let cookies = self.page.get_cookies().await.map_err(browser_err)?;
        let state = StoredState {
            cookies: cookies.iter().map(StoredCookie::from).collect(),
        };
        let value =
            serde_json::to_value(&state).map_err(|e| DriverError::SessionState(e.to_string()))?;
        Ok(Session::new(value))
    }
}

struct ChromiumElement {
    element: chromiumoxide::element::Element,
}

#[async_trait]
impl Element for ChromiumElement {
    async fn fill(&self, text: &str) -> DriverResult<()> {
        self.element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        self.element
            .click()
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        self.element
            .type_str(text)
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        Ok(())
    }

    async fn click(&self) -> DriverResult<()> {
        self.element
            .click()
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        Ok(())
    }
}
