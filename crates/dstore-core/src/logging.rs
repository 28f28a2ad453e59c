#![forbid(unsafe_code)]

//! Structured JSON logging for hosts embedding the store.
//!
//! The filter comes from `RUST_LOG` and falls back to `info`.

use tracing_subscriber::EnvFilter;

/// Install a global JSON `tracing` subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init()
        .is_ok()
}
