#![forbid(unsafe_code)]

//! Observable record store with synchronous change notification.
//!
//! # Design
//!
//! [`DataStore`] keeps the current [`StoreState`] as an `Rc` snapshot inside
//! shared, reference-counted storage (`Rc<..>` with `RefCell` fields). Every
//! [`Mutation`] builds the complete next snapshot first and publishes it in
//! one swap. Subscribers are then notified in registration order before
//! [`mutate`](DataStore::mutate) returns.
//!
//! # Dispatch
//!
//! The subscriber list is copied before dispatch and no borrow is held while
//! callbacks run. Consequences:
//!
//! - a subscriber added during dispatch first hears the *next* mutation;
//! - a subscriber removed during dispatch is skipped for the rest of it;
//! - callbacks may read state, subscribe, unsubscribe, or mutate again
//!   (the nested mutation dispatches before the outer dispatch resumes).
//!
//! # Failure Modes
//!
//! - **Rejected mutation**: nothing is published and nobody is notified.
//! - **Panicking callback**: the panic propagates to the caller of `mutate`.
//!   The new snapshot is already published; later subscribers in that
//!   dispatch are not called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use dstore_core::{Record, RecordId, Result, StoreConfig};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::mutation::Mutation;
use super::state::{Page, StoreState};

/// One registered callback.
struct Slot {
    id: u64,
    /// Cleared on unsubscribe so an in-flight dispatch skips the callback.
    active: Cell<bool>,
    callback: Box<dyn Fn()>,
}

/// Shared interior for [`DataStore`].
struct StoreInner {
    config: StoreConfig,
    state: RefCell<Rc<StoreState>>,
    subscribers: RefCell<Vec<Rc<Slot>>>,
    next_slot_id: Cell<u64>,
}

impl StoreInner {
    fn remove_slot(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|slot| slot.id != id);
    }
}

/// The authoritative in-memory state of one record collection.
///
/// Cloning a `DataStore` creates a new handle to the **same** store. Pass
/// handles explicitly to whoever needs them; there is no global registry.
///
/// # Invariants
///
/// 1. Only [`mutate`](Self::mutate) changes the state.
/// 2. Published snapshots are immutable.
/// 3. Each successful mutation notifies every subscriber registered at
///    dispatch start exactly once, in registration order.
pub struct DataStore {
    inner: Rc<StoreInner>,
}

impl Clone for DataStore {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.get_state();
        f.debug_struct("DataStore")
            .field("name", &self.inner.config.name)
            .field("records", &state.len())
            .field("total_count", &state.total_count())
            .field("loading", &state.is_loading())
            .field("version", &state.version())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl DataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let page = Page {
            offset: config.initial_offset,
            limit: config.page_limit,
        };
        Self {
            inner: Rc::new(StoreInner {
                config,
                state: RefCell::new(Rc::new(StoreState::empty(page))),
                subscribers: RefCell::new(Vec::new()),
                next_slot_id: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The current snapshot. Cheap: shares the published `Rc`.
    #[must_use]
    pub fn get_state(&self) -> Rc<StoreState> {
        Rc::clone(&self.inner.state.borrow())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().version()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether both handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the store alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakDataStore {
        WeakDataStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Register `callback` to run after every successful mutation.
    ///
    /// The returned [`Subscription`] removes the registration when
    /// [`unsubscribe`](Subscription::unsubscribe) is called or when it is
    /// dropped.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        let id = self.inner.next_slot_id.get();
        self.inner.next_slot_id.set(id + 1);
        let slot = Rc::new(Slot {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        });
        let weak_slot = Rc::downgrade(&slot);
        self.inner.subscribers.borrow_mut().push(slot);
        trace!(store = %self.inner.config.name, slot = id, "subscribed");
        Subscription {
            store: Rc::downgrade(&self.inner),
            slot: Some(weak_slot),
        }
    }

    /// Apply `mutation` and notify subscribers.
    ///
    /// On error the store is unchanged and no subscriber runs.
    pub fn mutate(&self, mutation: Mutation) -> Result<()> {
        let kind = mutation.kind();
        let current = self.get_state();
        let next = match mutation.apply(&current, &self.inner.config) {
            Ok(next) => next,
            Err(err) => {
                warn!(store = %self.inner.config.name, kind, error = %err, "mutation rejected");
                return Err(err);
            }
        };
        debug!(
            store = %self.inner.config.name,
            kind,
            version = next.version(),
            records = next.len(),
            total_count = next.total_count(),
            "mutation applied"
        );
        *self.inner.state.borrow_mut() = Rc::new(next);
        self.notify();
        Ok(())
    }

    pub fn load(&self, records: Vec<Record>, total_count: u64) -> Result<()> {
        self.mutate(Mutation::load(records, total_count))
    }

    pub fn load_page(&self, offset: u64, records: Vec<Record>, total_count: u64) -> Result<()> {
        self.mutate(Mutation::load_page(offset, records, total_count))
    }

    pub fn append(&self, records: Vec<Record>) -> Result<()> {
        self.mutate(Mutation::append(records))
    }

    pub fn update_by_id(&self, id: RecordId, patch: Map<String, Value>) -> Result<()> {
        self.mutate(Mutation::update_by_id(id, patch))
    }

    pub fn refresh(&self, record: Record) -> Result<()> {
        self.mutate(Mutation::Refresh { record })
    }

    pub fn remove_by_id(&self, id: RecordId) -> Result<()> {
        self.mutate(Mutation::remove_by_id(id))
    }

    pub fn remove_many(&self, ids: Vec<RecordId>) -> Result<()> {
        self.mutate(Mutation::RemoveMany { ids })
    }

    pub fn set_loading(&self, loading: bool) -> Result<()> {
        self.mutate(Mutation::SetLoading(loading))
    }

    pub fn clear(&self) -> Result<()> {
        self.mutate(Mutation::Clear)
    }

    fn notify(&self) {
        let slots: Vec<Rc<Slot>> = self.inner.subscribers.borrow().clone();
        trace!(store = %self.inner.config.name, subscribers = slots.len(), "dispatch");
        for slot in &slots {
            if slot.active.get() {
                (slot.callback)();
            }
        }
    }
}

/// Non-owning handle to a [`DataStore`].
#[derive(Clone)]
pub struct WeakDataStore {
    inner: Weak<StoreInner>,
}

impl WeakDataStore {
    #[must_use]
    pub fn upgrade(&self) -> Option<DataStore> {
        self.inner.upgrade().map(|inner| DataStore { inner })
    }
}

impl fmt::Debug for WeakDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDataStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// RAII guard for a store subscription.
///
/// Dropping the guard unsubscribes. Unsubscribing twice, or after the store
/// is gone, does nothing.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<StoreInner>,
    slot: Option<Weak<Slot>>,
}

impl Subscription {
    /// Remove the registration. The callback will not run again, even later
    /// in a dispatch that is currently in progress.
    pub fn unsubscribe(&mut self) {
        let Some(weak_slot) = self.slot.take() else {
            return;
        };
        let Some(slot) = weak_slot.upgrade() else {
            return;
        };
        slot.active.set(false);
        if let Some(store) = self.store.upgrade() {
            store.remove_slot(slot.id);
            trace!(store = %store.config.name, slot = slot.id, "unsubscribed");
        }
    }

    /// Whether the callback is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|slot| slot.active.get())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
