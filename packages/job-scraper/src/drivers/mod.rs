//! Concrete browser drivers.

#[cfg(feature = "chromium")]
pub mod chromium;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumDriver;
