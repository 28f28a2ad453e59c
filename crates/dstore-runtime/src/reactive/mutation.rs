#![forbid(unsafe_code)]

//! The closed set of operations that change a store.
//!
//! [`Mutation::apply`] is pure: it reads the current snapshot and either
//! returns the complete next snapshot or an error. The store publishes the
//! result in a single swap, so no observer can see a half-applied mutation.
//!
//! # Failure Modes
//!
//! - **Unknown id**: `UpdateById`, `Refresh`, `RemoveById` and `RemoveMany`
//!   skip ids that are not loaded. Removal races are routine in list views.
//! - **Malformed input**: duplicate ids or a patch rewriting the id fail fast
//!   with a [`StoreError`] and nothing is published.

use std::collections::HashSet;

use dstore_core::record::check_patch_id;
use dstore_core::{Record, RecordId, Result, StoreConfig, StoreError};
use serde_json::{Map, Value};

use super::state::{Page, StoreState};

/// A state-changing operation on a [`DataStore`](super::DataStore).
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Replace the loaded records. `offset: None` keeps the current offset.
    Load {
        records: Vec<Record>,
        total_count: u64,
        offset: Option<u64>,
    },
    /// Add records at the end and raise the total count accordingly.
    Append { records: Vec<Record> },
    /// Merge `patch` into the record with `id`.
    UpdateById {
        id: RecordId,
        patch: Map<String, Value>,
    },
    /// Refresh the loaded fields of a record from a freshly read copy.
    Refresh { record: Record },
    RemoveById { id: RecordId },
    RemoveMany { ids: Vec<RecordId> },
    SetLoading(bool),
    /// Drop every record and reset paging.
    Clear,
}

impl Mutation {
    #[must_use]
    pub const fn load(records: Vec<Record>, total_count: u64) -> Self {
        Self::Load {
            records,
            total_count,
            offset: None,
        }
    }

    #[must_use]
    pub const fn load_page(offset: u64, records: Vec<Record>, total_count: u64) -> Self {
        Self::Load {
            records,
            total_count,
            offset: Some(offset),
        }
    }

    #[must_use]
    pub const fn append(records: Vec<Record>) -> Self {
        Self::Append { records }
    }

    #[must_use]
    pub const fn update_by_id(id: RecordId, patch: Map<String, Value>) -> Self {
        Self::UpdateById { id, patch }
    }

    #[must_use]
    pub const fn remove_by_id(id: RecordId) -> Self {
        Self::RemoveById { id }
    }

    /// Build an `UpdateById` from loosely typed JSON input.
    ///
    /// Fails if `key` is not an integer id or `patch` is not an object.
    pub fn update_by_key(key: &Value, patch: Value) -> Result<Self> {
        let id = RecordId::from_value(key)?;
        match patch {
            Value::Object(patch) => Ok(Self::UpdateById { id, patch }),
            other => Err(StoreError::not_an_object(&other)),
        }
    }

    /// Build a `RemoveById` from a loosely typed JSON id.
    pub fn remove_by_key(key: &Value) -> Result<Self> {
        RecordId::from_value(key).map(|id| Self::RemoveById { id })
    }

    /// Short name used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Append { .. } => "append",
            Self::UpdateById { .. } => "update_by_id",
            Self::Refresh { .. } => "refresh",
            Self::RemoveById { .. } => "remove_by_id",
            Self::RemoveMany { .. } => "remove_many",
            Self::SetLoading(_) => "set_loading",
            Self::Clear => "clear",
        }
    }

    /// Compute the snapshot that follows `state`.
    pub fn apply(self, state: &StoreState, config: &StoreConfig) -> Result<StoreState> {
        let mut next = state.clone();
        next.version = state.version + 1;

        match self {
            Self::Load {
                records,
                total_count,
                offset,
            } => {
                ensure_unique(&records, &HashSet::new())?;
                next.records = records.into_iter().collect();
                next.total_count = total_count;
                next.loading = false;
                next.page = Page {
                    offset: offset.unwrap_or(state.page.offset),
                    limit: config.page_limit,
                };
            }
            Self::Append { records } => {
                let loaded: HashSet<RecordId> = state.records.iter().map(Record::id).collect();
                ensure_unique(&records, &loaded)?;
                let added = records.len() as u64;
                next.records.extend(records);
                next.total_count = state
                    .total_count
                    .saturating_add(added)
                    .max(next.records.len() as u64);
            }
            Self::UpdateById { id, patch } => {
                check_patch_id(id, &patch)?;
                if let Some(pos) = state.position(id) {
                    let patched = state.records[pos].patched(&patch)?;
                    next.records.set(pos, patched);
                }
            }
            Self::Refresh { record } => {
                if let Some(pos) = state.position(record.id()) {
                    let refreshed = state.records[pos].refreshed(&record);
                    next.records.set(pos, refreshed);
                }
            }
            Self::RemoveById { id } => {
                if let Some(pos) = state.position(id) {
                    next.records.remove(pos);
                    next.total_count = state.total_count.saturating_sub(1);
                }
            }
            Self::RemoveMany { ids } => {
                let doomed: HashSet<RecordId> = ids.into_iter().collect();
                next.records.retain(|r| !doomed.contains(&r.id()));
                let removed = (state.records.len() - next.records.len()) as u64;
                next.total_count = state.total_count.saturating_sub(removed);
            }
            Self::SetLoading(loading) => next.loading = loading,
            Self::Clear => {
                next.records.clear();
                next.total_count = 0;
                next.loading = false;
                next.page = Page {
                    offset: config.initial_offset,
                    limit: config.page_limit,
                };
            }
        }

        Ok(next)
    }
}

fn ensure_unique(records: &[Record], loaded: &HashSet<RecordId>) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        let id = record.id();
        if loaded.contains(&id) || !seen.insert(id) {
            return Err(StoreError::DuplicateId { id });
        }
    }
    Ok(())
}
