#![forbid(unsafe_code)]

//! Immutable store snapshots.
//!
//! A [`StoreState`] is never modified after the store publishes it. Records
//! live in an [`im::Vector`], so building the next snapshot from the current
//! one shares every untouched chunk and cloning is O(1).

use dstore_core::{Record, RecordId};
use im::Vector;

/// Pagination window of the last load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// One published snapshot of a [`DataStore`](super::DataStore).
///
/// # Invariants
///
/// 1. Record ids are unique within `records`.
/// 2. `version` increments by exactly 1 per successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub(crate) records: Vector<Record>,
    pub(crate) total_count: u64,
    pub(crate) loading: bool,
    pub(crate) page: Page,
    pub(crate) version: u64,
}

impl StoreState {
    pub(crate) fn empty(page: Page) -> Self {
        Self {
            records: Vector::new(),
            total_count: 0,
            loading: false,
            page,
            version: 0,
        }
    }

    /// Loaded records in their current order.
    #[must_use]
    pub const fn records(&self) -> &Vector<Record> {
        &self.records
    }

    /// Total records available at the source. May exceed [`len`](Self::len).
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn page(&self) -> Page {
        self.page
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of the record with `id`, if loaded.
    #[must_use]
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    #[must_use]
    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.position(id).is_some()
    }

    /// Ids of the loaded records, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(Record::id).collect()
    }

    /// Whether the source holds records past the loaded window.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page
            .offset
            .saturating_add(self.records.len() as u64)
            < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with(ids: &[i64], total: u64, offset: u64) -> StoreState {
        let mut state = StoreState::empty(Page { offset, limit: 40 });
        state.records = ids
            .iter()
            .map(|id| Record::from_value(json!({"id": id})).unwrap())
            .collect();
        state.total_count = total;
        state
    }

    #[test]
    fn empty_state() {
        let state = StoreState::empty(Page::default());
        assert!(state.is_empty());
        assert_eq!(state.total_count(), 0);
        assert!(!state.is_loading());
        assert_eq!(state.version(), 0);
        assert!(!state.has_more());
    }

    #[test]
    fn lookups() {
        let state = state_with(&[3, 1, 2], 3, 0);
        assert_eq!(state.position(RecordId(1)), Some(1));
        assert_eq!(state.find(RecordId(2)).map(Record::id), Some(RecordId(2)));
        assert!(!state.contains(RecordId(9)));
        assert_eq!(state.ids(), vec![RecordId(3), RecordId(1), RecordId(2)]);
    }

    #[test]
    fn has_more_accounts_for_offset() {
        assert!(state_with(&[1, 2], 10, 0).has_more());
        assert!(!state_with(&[1, 2], 10, 8).has_more());
        assert!(state_with(&[1, 2], 10, 7).has_more());
    }

    #[test]
    fn has_more_at_offset_limits() {
        assert!(!state_with(&[1], 5, u64::MAX).has_more());
        assert!(!state_with(&[1, 2], u64::MAX, u64::MAX - 2).has_more());
        assert!(state_with(&[1], u64::MAX, u64::MAX - 2).has_more());
    }
}
