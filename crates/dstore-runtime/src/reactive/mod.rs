#![forbid(unsafe_code)]

//! Reactive record store and render bindings.
//!
//! This module provides the change-tracking primitives list and form views
//! build on:
//!
//! - [`DataStore`]: the authoritative in-memory state of one record
//!   collection, changed only through [`Mutation`]s.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Selector`]: a shared projection of [`StoreState`], optionally
//!   memoized over declared dependencies.
//! - [`Binding`]: keeps one consumer's projection current and signals a
//!   re-render only when it changes.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc`/`RefCell`). Snapshots are immutable
//! `Rc<StoreState>` values backed by persistent vectors, so publishing a new
//! state is a pointer swap and old snapshots stay valid.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per successful mutation.
//! 2. Subscribers are notified synchronously, in registration order, before
//!    `mutate` returns.
//! 3. A rejected mutation publishes nothing and notifies nobody.
//! 4. A subscriber removed mid-dispatch receives nothing further; one added
//!    mid-dispatch waits for the next mutation.

pub mod binding;
pub mod mutation;
pub mod selector;
pub mod state;
pub mod store;

pub use binding::Binding;
pub use mutation::Mutation;
pub use selector::Selector;
pub use state::{Page, StoreState};
pub use store::{DataStore, Subscription, WeakDataStore};
