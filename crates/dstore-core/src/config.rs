#![forbid(unsafe_code)]

//! Store configuration.
//!
//! Defaults can be overridden from the environment with the `DSTORE_*`
//! prefix:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DSTORE_PAGE_LIMIT` | [`StoreConfig::page_limit`] |
//! | `DSTORE_INITIAL_OFFSET` | [`StoreConfig::initial_offset`] |

use std::env;

use crate::error::{Result, StoreError};

/// Default number of records fetched per page.
pub const DEFAULT_PAGE_LIMIT: u64 = 40;

const ENV_PAGE_LIMIT: &str = "DSTORE_PAGE_LIMIT";
const ENV_INITIAL_OFFSET: &str = "DSTORE_INITIAL_OFFSET";

/// Configuration for one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// Label used in log fields (usually the model or view name).
    pub name: String,
    /// Page size recorded with each load.
    pub page_limit: u64,
    /// Offset the store starts at and returns to on `Clear`.
    pub initial_offset: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".into(),
            page_limit: DEFAULT_PAGE_LIMIT,
            initial_offset: 0,
        }
    }
}

impl StoreConfig {
    /// Defaults with `DSTORE_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Split out from [`StoreConfig::from_env`] so tests do not touch the
    /// process environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_PAGE_LIMIT) {
            self.page_limit = parse_u64(ENV_PAGE_LIMIT, &raw)?;
            if self.page_limit == 0 {
                return Err(StoreError::invalid_config(format!(
                    "{ENV_PAGE_LIMIT} must be positive"
                )));
            }
        }
        if let Some(raw) = lookup(ENV_INITIAL_OFFSET) {
            self.initial_offset = parse_u64(ENV_INITIAL_OFFSET, &raw)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub const fn with_page_limit(mut self, limit: u64) -> Self {
        self.page_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_initial_offset(mut self, offset: u64) -> Self {
        self.initial_offset = offset;
        self
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::invalid_config(format!("{key}: expected an integer, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.name, "store");
        assert_eq!(config.page_limit, 40);
        assert_eq!(config.initial_offset, 0);
    }

    #[test]
    fn builders() {
        let config = StoreConfig::default()
            .with_name("sale.order")
            .with_page_limit(10)
            .with_initial_offset(20);
        assert_eq!(config.name, "sale.order");
        assert_eq!(config.page_limit, 10);
        assert_eq!(config.initial_offset, 20);
    }

    #[test]
    fn overrides_apply() {
        let config = StoreConfig::default()
            .with_overrides(lookup(&[
                ("DSTORE_PAGE_LIMIT", " 100 "),
                ("DSTORE_INITIAL_OFFSET", "5"),
            ]))
            .unwrap();
        assert_eq!(config.page_limit, 100);
        assert_eq!(config.initial_offset, 5);
    }

    #[test]
    fn no_overrides_keeps_values() {
        let base = StoreConfig::default().with_page_limit(7);
        assert_eq!(base.clone().with_overrides(lookup(&[])).unwrap(), base);
    }

    #[test]
    fn bad_override_is_reported() {
        let err = StoreConfig::default()
            .with_overrides(lookup(&[("DSTORE_PAGE_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig { .. }));
        assert!(err.to_string().contains("DSTORE_PAGE_LIMIT"));
    }

    #[test]
    fn zero_page_limit_rejected() {
        let err = StoreConfig::default()
            .with_overrides(lookup(&[("DSTORE_PAGE_LIMIT", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_with_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"name": "grid"}"#).unwrap();
        assert_eq!(config.name, "grid");
        assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
    }
}
