#![forbid(unsafe_code)]

//! dstore public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use dstore_core as core;
    pub use dstore_runtime as runtime;

    pub use dstore_core::{Record, RecordId, Result, StoreConfig, StoreError, records_from_values};
    pub use dstore_runtime::{
        Binding, DataStore, Mutation, Page, Selector, StoreState, Subscription,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use serde_json::json;

    #[test]
    fn prelude_covers_a_list_view() {
        let store = DataStore::new(StoreConfig::default().with_name("sale.order"));
        let records = records_from_values(vec![json!({"id": 1}), json!({"id": 2})]).unwrap();
        store.load(records, 12).unwrap();

        let mut binding = Binding::new(|| {});
        let has_more = Selector::new(StoreState::has_more);
        assert!(binding.bind(&store, &has_more));
    }
}
