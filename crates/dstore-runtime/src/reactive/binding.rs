#![forbid(unsafe_code)]

//! Selector bindings: the glue between one rendering unit and one store.
//!
//! # State machine
//!
//! ```text
//! Unbound --bind--> Bound(store, selector) --notify--> Bound (value maybe updated)
//!                   Bound --bind(other)--> Bound(other store/selector)
//!                   Bound --teardown/drop--> Unbound
//! ```
//!
//! # Invariants
//!
//! 1. A bound binding owns exactly one live [`Subscription`].
//! 2. `on_change` fires only when a recomputed projection differs from the
//!    previous one by `PartialEq`.
//! 3. Rebinding or tearing down releases the old subscription and discards
//!    the stale projection.
//!
//! # Failure Modes
//!
//! - **Selector panics**: the panic propagates out of `bind`, or out of the
//!   `mutate` call whose notification triggered recomputation. The previous
//!   value is kept.
//! - **Store handle dropped**: a bound binding holds its own handle, so the
//!   store stays alive and keeps notifying until teardown or rebind.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::selector::Selector;
use super::store::{DataStore, Subscription};

/// State shared with the store callback.
struct BindingShared<T> {
    value: RefCell<Option<T>>,
    updates: Cell<u64>,
    on_change: Box<dyn Fn()>,
}

impl<T: PartialEq> BindingShared<T> {
    fn accept(&self, next: T) {
        let changed = {
            let mut value = self.value.borrow_mut();
            if value.as_ref() == Some(&next) {
                false
            } else {
                *value = Some(next);
                true
            }
        };
        if changed {
            self.updates.set(self.updates.get() + 1);
            (self.on_change)();
        }
    }
}

struct Bound<T> {
    store: DataStore,
    selector: Selector<T>,
    _subscription: Subscription,
}

/// Keeps a projected value of a [`DataStore`] up to date for one consumer.
///
/// Dropping the binding tears it down.
pub struct Binding<T> {
    shared: Rc<BindingShared<T>>,
    bound: Option<Bound<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("bound", &self.bound.is_some())
            .field("value", &self.shared.value.borrow())
            .field("updates", &self.shared.updates.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Create an unbound binding. `on_change` is the consumer's re-render
    /// signal.
    #[must_use]
    pub fn new(on_change: impl Fn() + 'static) -> Self {
        Self {
            shared: Rc::new(BindingShared {
                value: RefCell::new(None),
                updates: Cell::new(0),
                on_change: Box::new(on_change),
            }),
            bound: None,
        }
    }

    /// Bind to `store` through `selector` and return the current projection.
    ///
    /// Calling again with the same store and selector is cheap and returns
    /// the current value. A different store or selector triggers a rebind.
    pub fn bind(&mut self, store: &DataStore, selector: &Selector<T>) -> T {
        if let Some(bound) = &self.bound {
            if bound.store.ptr_eq(store) && bound.selector.same(selector) {
                if let Some(value) = self.value() {
                    return value;
                }
            }
            debug!(from = %bound.store.name(), to = %store.name(), "rebinding");
            self.teardown();
        }

        let initial = selector.select(&store.get_state());
        *self.shared.value.borrow_mut() = Some(initial.clone());

        let weak_shared = Rc::downgrade(&self.shared);
        let weak_store = store.downgrade();
        let project = selector.clone();
        let subscription = store.subscribe(move || {
            let (Some(shared), Some(store)) = (weak_shared.upgrade(), weak_store.upgrade()) else {
                return;
            };
            let next = project.select(&store.get_state());
            shared.accept(next);
        });

        debug!(store = %store.name(), "bound");
        self.bound = Some(Bound {
            store: store.clone(),
            selector: selector.clone(),
            _subscription: subscription,
        });
        initial
    }

    /// Unsubscribe and return to the unbound state.
    pub fn teardown(&mut self) {
        if let Some(bound) = self.bound.take() {
            debug!(store = %bound.store.name(), "teardown");
            drop(bound);
        }
        *self.shared.value.borrow_mut() = None;
    }

    /// The current projection, or `None` while unbound.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.shared.value.borrow().clone()
    }

    /// Access the current projection by reference.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.shared.value.borrow().as_ref())
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// How many times `on_change` has fired.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.shared.updates.get()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::StoreState;
    use dstore_core::{Record, RecordId};
    use serde_json::json;

    fn rec(id: i64) -> Record {
        Record::from_value(json!({"id": id, "name": format!("r{id}")})).unwrap()
    }

    fn render_counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let renders = Rc::new(Cell::new(0u32));
        let renders_clone = Rc::clone(&renders);
        (renders, move || renders_clone.set(renders_clone.get() + 1))
    }

    #[test]
    fn bind_returns_initial_projection() {
        let store = DataStore::default();
        store.load(vec![rec(1), rec(2)], 7).unwrap();
        let (renders, on_change) = render_counter();
        let mut binding = Binding::new(on_change);

        assert!(!binding.is_bound());
        assert_eq!(binding.value(), None);
        assert_eq!(binding.bind(&store, &Selector::new(StoreState::total_count)), 7);
        assert!(binding.is_bound());
        assert_eq!(binding.value(), Some(7));
        assert_eq!(renders.get(), 0);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn two_bindings_update_once_each() {
        let store = DataStore::default();
        let (count_renders, on_count) = render_counter();
        let (len_renders, on_len) = render_counter();
        let s1 = Selector::new(StoreState::total_count);
        let s2 = Selector::new(|state: &StoreState| state.records().len());
        let mut b1 = Binding::new(on_count);
        let mut b2 = Binding::new(on_len);
        b1.bind(&store, &s1);
        b2.bind(&store, &s2);

        store.append(vec![rec(2)]).unwrap();

        assert_eq!(count_renders.get(), 1);
        assert_eq!(len_renders.get(), 1);
        assert_eq!(b1.value(), Some(1));
        assert_eq!(b2.value(), Some(1));
    }

    #[test]
    fn constant_selector_never_rerenders() {
        let store = DataStore::default();
        let (renders, on_change) = render_counter();
        let mut binding = Binding::new(on_change);
        binding.bind(&store, &Selector::new(|_: &StoreState| "fixed"));

        store.load(vec![rec(1)], 1).unwrap();
        store.update_by_id(RecordId(1), json!({"name": "x"}).as_object().unwrap().clone()).unwrap();
        store.set_loading(true).unwrap();
        store.clear().unwrap();

        assert_eq!(renders.get(), 0);
        assert_eq!(binding.updates(), 0);
    }

    #[test]
    fn same_pair_does_not_resubscribe() {
        let store = DataStore::default();
        let selector = Selector::new(StoreState::len);
        let mut binding = Binding::new(|| {});
        binding.bind(&store, &selector);
        binding.bind(&store, &selector.clone());
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn rebind_to_other_store_releases_old() {
        let first = DataStore::default();
        let second = DataStore::default();
        second.load(vec![rec(1), rec(2), rec(3)], 3).unwrap();
        let selector = Selector::new(StoreState::len);
        let (renders, on_change) = render_counter();
        let mut binding = Binding::new(on_change);

        assert_eq!(binding.bind(&first, &selector), 0);
        assert_eq!(binding.bind(&second, &selector), 3);
        assert_eq!(first.subscriber_count(), 0);
        assert_eq!(second.subscriber_count(), 1);

        // Old store no longer reaches the binding.
        first.load(vec![rec(9)], 1).unwrap();
        assert_eq!(renders.get(), 0);
        assert_eq!(binding.value(), Some(3));

        second.remove_by_id(RecordId(1)).unwrap();
        assert_eq!(renders.get(), 1);
        assert_eq!(binding.value(), Some(2));
    }

    #[test]
    fn rebind_to_other_selector_discards_projection() {
        let store = DataStore::default();
        store.load(vec![rec(1)], 50).unwrap();
        let mut binding = Binding::new(|| {});
        assert_eq!(binding.bind(&store, &Selector::new(StoreState::total_count)), 50);
        // A fresh selector has a new identity even with the same code.
        let len = Selector::new(|state: &StoreState| state.len() as u64);
        assert_eq!(binding.bind(&store, &len), 1);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn teardown_unsubscribes() {
        let store = DataStore::default();
        let (renders, on_change) = render_counter();
        let mut binding = Binding::new(on_change);
        binding.bind(&store, &Selector::new(StoreState::len));

        binding.teardown();
        assert!(!binding.is_bound());
        assert_eq!(binding.value(), None);
        assert_eq!(store.subscriber_count(), 0);

        store.append(vec![rec(1)]).unwrap();
        assert_eq!(renders.get(), 0);
    }

    #[test]
    fn drop_unsubscribes() {
        let store = DataStore::default();
        {
            let mut binding = Binding::new(|| {});
            binding.bind(&store, &Selector::new(StoreState::len));
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn on_change_sees_new_value() {
        let store = DataStore::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let probe = store.clone();
        let mut binding = Binding::new(move || {
            seen_clone.borrow_mut().push(probe.get_state().len());
        });
        binding.bind(&store, &Selector::new(StoreState::ids));

        store.append(vec![rec(1)]).unwrap();
        store.append(vec![rec(2)]).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(binding.value(), Some(vec![RecordId(1), RecordId(2)]));
    }

    #[test]
    fn fallible_selector_surfaces_error_as_value() {
        let store = DataStore::default();
        let first_name = Selector::new(|state: &StoreState| {
            state
                .records()
                .front()
                .and_then(|r| r.get("name").cloned())
                .ok_or("no records")
        });
        let mut binding = Binding::new(|| {});
        assert_eq!(binding.bind(&store, &first_name), Err("no records"));

        store.load(vec![rec(4)], 1).unwrap();
        assert_eq!(binding.value(), Some(Ok(json!("r4"))));
    }

    #[test]
    #[should_panic(expected = "selector failed")]
    fn selector_panic_propagates_through_mutate() {
        let store = DataStore::default();
        let mut binding = Binding::new(|| {});
        binding.bind(
            &store,
            &Selector::new(|state: &StoreState| {
                assert!(!state.is_loading(), "selector failed");
                state.len()
            }),
        );
        let _ = store.set_loading(true);
    }

    #[test]
    fn binding_survives_store_drop() {
        let mut binding = Binding::new(|| {});
        {
            let store = DataStore::default();
            store.load(vec![rec(1)], 1).unwrap();
            binding.bind(&store, &Selector::new(StoreState::len));
        }
        // The binding holds its own store handle, so the store is still alive.
        assert_eq!(binding.value(), Some(1));
        binding.teardown();
        assert_eq!(binding.value(), None);
    }

    #[test]
    fn with_borrows_value() {
        let store = DataStore::default();
        store.load(vec![rec(1), rec(2)], 2).unwrap();
        let mut binding = Binding::new(|| {});
        binding.bind(&store, &Selector::new(StoreState::ids));
        assert_eq!(binding.with(|ids| ids.map_or(0, Vec::len)), 2);
    }
}
