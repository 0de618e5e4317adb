//! Data types shared across the scraper.

pub mod record;
pub mod session;

pub use record::{ContractType, JobRecord, LocationType, HEADER};
pub use session::Session;
