//! Trait abstractions at the browser boundary.

pub mod driver;

pub use driver::{BrowserContext, BrowserDriver, Element, ElementSet, Page};
