#![forbid(unsafe_code)]

//! Runtime: the observable record store and the bindings that feed views.

pub mod reactive;

pub use reactive::{
    Binding, DataStore, Mutation, Page, Selector, StoreState, Subscription, WeakDataStore,
};
