//! Typed errors for the scraper.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the binary adds
//! context with `anyhow` at the top level.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::LoginStep;

/// Errors that abort (or, for `CorruptSession`, redirect) a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A login-flow element was missing or an interaction with it failed.
    #[error("authentication failed at step '{step}': {reason}")]
    AuthenticationFailed { step: LoginStep, reason: String },

    /// The stored session artifact could not be read or parsed.
    #[error("corrupt session artifact {}: {reason}", .path.display())]
    CorruptSession { path: PathBuf, reason: String },

    /// Loading a listing page, or a query on it, failed or returned an unexpected shape.
    #[error("fetch failed on {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// Appending rows to the sink file failed.
    #[error("failed to append records to {}: {source}", .path.display())]
    SinkWriteFailed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Persisting (or discarding) the session artifact failed.
    #[error("failed to write session artifact {}: {source}", .path.display())]
    SessionWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Browser driver failure outside the login and fetch steps
    #[error("browser driver error: {0}")]
    Driver(#[from] DriverError),

    /// Missing or invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Errors reported by a browser driver implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page did not reach ready state within the driver's own timeout.
    #[error("timed out waiting for page to become ready")]
    ReadyTimeout,

    #[error("query failed: {0}")]
    Query(String),

    #[error("element interaction failed: {0}")]
    Interaction(String),

    #[error("session state error: {0}")]
    SessionState(String),

    #[error("browser error: {0}")]
    Browser(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for scrape operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
