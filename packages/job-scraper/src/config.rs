//! Scraper configuration.

use std::env;
use std::path::PathBuf;

use crate::auth::SettleDelay;
use crate::error::{Result, ScrapeError};
use crate::pagination::RetryPolicy;
use crate::security::{Credentials, SecretString};

pub const DEFAULT_LOGIN_URL: &str = "https://www.idealist.org/";
pub const DEFAULT_START_URL: &str = "https://www.idealist.org/jobs";
pub const DEFAULT_SESSION_PATH: &str = "idealist_login.json";
pub const DEFAULT_OUTPUT_PATH: &str = "job_posts.csv";

/// Everything a run needs. Built from the environment by the binary, or
/// directly with the `with_*` setters in tests.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// First listing page of the traversal.
    pub start_url: String,

    /// Page the login flow starts from.
    pub login_url: String,

    pub session_path: PathBuf,
    pub output_path: PathBuf,

    /// Login credentials; only needed when no valid session is stored.
    pub credentials: Option<Credentials>,

    /// Key for the semantic query service used by the Chromium driver.
    pub query_api_key: Option<SecretString>,

    pub settle_delay: SettleDelay,
    pub retry: RetryPolicy,

    /// Stop after this many pages. Unbounded when `None`.
    pub max_pages: Option<usize>,

    pub headless: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            credentials: None,
            query_api_key: None,
            settle_delay: SettleDelay::default(),
            retry: RetryPolicy::default(),
            max_pages: None,
            headless: false,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("JOB_SCRAPER_START_URL") {
            config.start_url = parse_url("JOB_SCRAPER_START_URL", &url)?;
        }
        if let Some(url) = var("JOB_SCRAPER_LOGIN_URL") {
            config.login_url = parse_url("JOB_SCRAPER_LOGIN_URL", &url)?;
        }
        if let Some(path) = var("JOB_SCRAPER_SESSION_PATH") {
            config.session_path = PathBuf::from(path);
        }
        if let Some(path) = var("JOB_SCRAPER_OUTPUT_PATH") {
            config.output_path = PathBuf::from(path);
        }

        config.credentials = match (var("EMAIL"), var("PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials::new(email, password)),
            (None, None) => None,
            _ => {
                return Err(ScrapeError::Config(
                    "EMAIL and PASSWORD must be set together".to_string(),
                ))
            }
        };
        config.query_api_key = var("AGENTQL_API_KEY").map(SecretString::new);

        if let Some(raw) = var("JOB_SCRAPER_MAX_PAGES") {
            let max: usize = raw.trim().parse().map_err(|_| {
                ScrapeError::Config(format!(
                    "JOB_SCRAPER_MAX_PAGES must be a positive number, got '{}'",
                    raw
                ))
            })?;
            if max == 0 {
                return Err(ScrapeError::Config(
                    "JOB_SCRAPER_MAX_PAGES must be at least 1".to_string(),
                ));
            }
            config.max_pages = Some(max);
        }

        if let Some(raw) = var("JOB_SCRAPER_HEADLESS") {
            config.headless = parse_flag("JOB_SCRAPER_HEADLESS", &raw)?;
        }

        Ok(config)
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_query_api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.query_api_key = Some(key.into());
        self
    }

    pub fn with_settle_delay(mut self, delay: SettleDelay) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

fn parse_url(key: &str, raw: &str) -> Result<String> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| ScrapeError::Config(format!("{} is not a valid URL: {}", key, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ScrapeError::Config(format!(
            "{} must be http(s), got scheme '{}'",
            key, other
        ))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScrapeError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
