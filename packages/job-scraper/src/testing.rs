//! Testing utilities including a scripted browser driver.
//!
//! [`FakeSite`] stands in for a real browser: pages are canned query
//! responses keyed by URL, every driver call is recorded, and failures can be
//! injected per URL. Clones share state, so a test can hand one clone to an
//! `Orchestrator` and inspect the other afterwards.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{DriverError, DriverResult};
use crate::query::{shapes, QueryShape};
use crate::traits::driver::{BrowserContext, BrowserDriver, Element, ElementSet, Page};
use crate::types::Session;

/// Scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "job-scraper-{label}-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Record of a call made against the fake driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    NewPage,
    NewContext,
    Goto(String),
    WaitForReady,
    /// Record query, tagged with the URL the tab was on.
    QueryData(String),
    /// Element query, tagged with the shape's root field.
    QueryElements(String),
    Fill { path: String, text: String },
    Click(String),
    /// Navigation caused by clicking a next-page control.
    FollowLink(String),
    CaptureState,
}

/// One scripted listing page.
#[derive(Debug, Clone)]
pub struct FakePage {
    url: String,
    response: Value,
    next: Option<String>,
}

impl FakePage {
    /// A page with no listings and no next-page control.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            response: json!({ "job_posts": [] }),
            next: None,
        }
    }

    /// Listing items returned by the record query.
    pub fn with_posts(mut self, posts: Vec<Value>) -> Self {
        self.response = json!({ "job_posts": posts });
        self
    }

    /// Raw record-query response, for malformed-shape scenarios.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    /// Show a next-page control that leads to `url`.
    pub fn with_next(mut self, url: impl Into<String>) -> Self {
        self.next = Some(url.into());
        self
    }
}

/// Convenience for building a listing item.
pub fn post(org_name: &str, job_title: &str) -> Value {
    json!({
        "org_name": org_name,
        "job_title": job_title,
        "salary": "",
        "location": "Minneapolis, MN",
        "contract_type": "Full time",
        "location_type": "on-site",
        "date_posted": "1 day ago"
    })
}

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, FakePage>,
    missing: HashSet<String>,
    query_failures: HashMap<String, usize>,
    ready_failures: HashSet<String>,
    actions: Vec<DriverAction>,
    contexts: Vec<Session>,
    captures: usize,
}

/// Scripted in-memory site implementing [`BrowserDriver`].
///
/// Login controls are always present unless removed with
/// [`FakeSite::without_element`]. The next-page control is present only on
/// pages scripted with [`FakePage::with_next`].
#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<RwLock<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: FakePage) -> Self {
        self.state
            .write()
            .unwrap()
            .pages
            .insert(page.url.clone(), page);
        self
    }

    /// Hide the element at `path` from every element query.
    pub fn without_element(self, path: &str) -> Self {
        self.state.write().unwrap().missing.insert(path.to_string());
        self
    }

    /// Fail the next `times` record queries made on `url`.
    pub fn fail_queries(self, url: &str, times: usize) -> Self {
        self.state
            .write()
            .unwrap()
            .query_failures
            .insert(url.to_string(), times);
        self
    }

    /// Make every readiness wait on `url` time out.
    pub fn fail_ready(self, url: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .ready_failures
            .insert(url.to_string());
        self
    }

    /// Every call made so far, in order.
    pub fn actions(&self) -> Vec<DriverAction> {
        self.state.read().unwrap().actions.clone()
    }

    /// `Goto` plus `FollowLink` actions.
    pub fn navigation_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .actions
            .iter()
            .filter(|a| matches!(a, DriverAction::Goto(_) | DriverAction::FollowLink(_)))
            .count()
    }

    /// Record queries issued while the tab was on `url`.
    pub fn query_data_count(&self, url: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .actions
            .iter()
            .filter(|a| matches!(a, DriverAction::QueryData(u) if u == url))
            .count()
    }

    /// Sessions passed to `new_context`, in order.
    pub fn contexts(&self) -> Vec<Session> {
        self.state.read().unwrap().contexts.clone()
    }

    /// Times the email field of the login form was filled.
    pub fn login_attempts(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .actions
            .iter()
            .filter(|a| matches!(a, DriverAction::Fill { path, .. } if path == shapes::EMAIL_INPUT))
            .count()
    }

    fn record(&self, action: DriverAction) {
        self.state.write().unwrap().actions.push(action);
    }

    fn open_tab(&self) -> Box<dyn Page> {
        self.record(DriverAction::NewPage);
        Box::new(FakeTab {
            site: self.clone(),
            url: Arc::new(Mutex::new("about:blank".to_string())),
        })
    }
}

#[async_trait]
impl BrowserDriver for FakeSite {
    async fn new_page(&self) -> DriverResult<Box<dyn Page>> {
        Ok(self.open_tab())
    }

    async fn new_context(&self, session: &Session) -> DriverResult<Box<dyn BrowserContext>> {
        {
            let mut state = self.state.write().unwrap();
            state.actions.push(DriverAction::NewContext);
            state.contexts.push(session.clone());
        }
        Ok(Box::new(FakeContext { site: self.clone() }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeContext {
    site: FakeSite,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> DriverResult<Box<dyn Page>> {
        Ok(self.site.open_tab())
    }
}

struct FakeTab {
    site: FakeSite,
    url: Arc<Mutex<String>>,
}

impl FakeTab {
    fn current(&self) -> String {
        self.url.lock().unwrap().clone()
    }
}

#[async_trait]
impl Page for FakeTab {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        self.site.record(DriverAction::Goto(url.to_string()));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for_ready(&self) -> DriverResult<()> {
        self.site.record(DriverAction::WaitForReady);
        if self.site.state.read().unwrap().ready_failures.contains(&self.current()) {
            return Err(DriverError::ReadyTimeout);
        }
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.current())
    }

    async fn query_data(&self, _shape: &QueryShape) -> DriverResult<Value> {
        let url = self.current();
        let mut state = self.site.state.write().unwrap();
        state.actions.push(DriverAction::QueryData(url.clone()));

        if let Some(remaining) = state.query_failures.get_mut(&url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Query(format!("scripted failure on {}", url)));
            }
        }

        state
            .pages
            .get(&url)
            .map(|page| page.response.clone())
            .ok_or_else(|| DriverError::Query(format!("no page scripted for {}", url)))
    }

    async fn query_elements(&self, shape: &QueryShape) -> DriverResult<ElementSet> {
        let url = self.current();
        let mut state = self.site.state.write().unwrap();
        state
            .actions
            .push(DriverAction::QueryElements(shape.root_name().to_string()));

        let mut elements = ElementSet::new();
        for path in shape.leaf_paths() {
            if state.missing.contains(&path) {
                continue;
            }
            let follows = if path == shapes::NEXT_PAGE_BUTTON {
                match state.pages.get(&url).and_then(|p| p.next.clone()) {
                    Some(next) => Some(next),
                    None => continue,
                }
            } else {
                None
            };
            elements.insert(
                path.clone(),
                Box::new(FakeElement {
                    site: self.site.clone(),
                    tab_url: Arc::clone(&self.url),
                    path,
                    follows,
                }),
            );
        }
        Ok(elements)
    }

    async fn storage_state(&self) -> DriverResult<Session> {
        let mut state = self.site.state.write().unwrap();
        state.actions.push(DriverAction::CaptureState);
        state.captures += 1;
        Ok(Session::new(json!({
            "cookies": [{
                "name": "session",
                "value": format!("fake-{}", state.captures),
                "domain": ".idealist.org"
            }]
        })))
    }
}

struct FakeElement {
    site: FakeSite,
    tab_url: Arc<Mutex<String>>,
    path: String,
    follows: Option<String>,
}

#[async_trait]
impl Element for FakeElement {
    async fn fill(&self, text: &str) -> DriverResult<()> {
        self.site.record(DriverAction::Fill {
            path: self.path.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn click(&self) -> DriverResult<()> {
        self.site.record(DriverAction::Click(self.path.clone()));
        if let Some(next) = &self.follows {
            self.site.record(DriverAction::FollowLink(next.clone()));
            *self.tab_url.lock().unwrap() = next.clone();
        }
        Ok(())
    }
}
