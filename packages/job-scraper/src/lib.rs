//! Authenticated, Paginated Job-Listing Scraper
//!
//! Logs in to a job catalog once, keeps the resulting session on disk, then
//! walks the paginated listing and appends every record to a CSV file as each
//! page is read.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_scraper::{Orchestrator, ScraperConfig};
//! use job_scraper::drivers::ChromiumDriver;
//!
//! let config = ScraperConfig::from_env()?;
//! let driver = ChromiumDriver::launch(&config).await?;
//!
//! let report = Orchestrator::new(driver, config).run().await?;
//! println!("{} records over {} pages", report.records, report.pages);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Browser driver boundary (BrowserDriver, Page, Element)
//! - [`query`] - Query shapes sent through the boundary
//! - [`session`] - Session artifact storage
//! - [`auth`] - Interactive login flow
//! - [`pagination`] - Traversal state machine and retry policy
//! - [`sink`] - Append-only CSV output
//! - [`orchestrator`] - Composition of the above for one run
//! - [`drivers`] - Concrete drivers (Chromium, behind the `chromium` feature)
//! - [`testing`] - Scripted fake driver and fixtures

pub mod auth;
pub mod config;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod pagination;
pub mod query;
pub mod security;
pub mod session;
pub mod sink;
pub mod testing;
pub mod traits;
pub mod types;

pub use auth::{Authenticator, LoginStep, SettleDelay};
pub use config::ScraperConfig;
pub use error::{DriverError, DriverResult, Result, ScrapeError};
pub use orchestrator::Orchestrator;
pub use pagination::{PaginationEngine, RetryPolicy, StopReason, TraversalReport};
pub use query::{QueryField, QueryShape};
pub use security::{Credentials, SecretString};
pub use session::SessionStore;
pub use sink::RecordSink;
pub use traits::{BrowserContext, BrowserDriver, Element, ElementSet, Page};
pub use types::{ContractType, JobRecord, LocationType, Session, HEADER};
