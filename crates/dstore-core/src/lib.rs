#![forbid(unsafe_code)]

//! Core: records, identifiers, patch merging, errors, and store configuration.

pub mod config;
pub mod error;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod record;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use record::{Record, RecordId, records_from_values};
