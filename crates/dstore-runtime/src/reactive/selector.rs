#![forbid(unsafe_code)]

//! Selectors: pure projections from a [`StoreState`] to a derived value.
//!
//! A [`Selector`] is identified by its shared function, not by what the
//! function does. Clones keep the identity; two separately built selectors
//! are distinct even when their code is identical. [`Binding`](super::Binding)
//! relies on this to decide whether a `bind` call is a rebind.
//!
//! # Memoization
//!
//! [`Selector::memoized`] is opt-in. It takes a dependency extractor and a
//! compute function. The compute function runs only when the extracted
//! dependencies differ (by `PartialEq`) from the previous call; otherwise the
//! cached result is cloned.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the cache keeps the previous entry, so the
//!   next call retries.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::state::StoreState;

/// A shared, pure projection of store state.
pub struct Selector<T> {
    project: Rc<dyn Fn(&StoreState) -> T>,
}

// Manual Clone: shares the same Rc, so identity is preserved.
impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            project: Rc::clone(&self.project),
        }
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("ptr", &Rc::as_ptr(&self.project).cast::<()>())
            .finish()
    }
}

impl<T: 'static> Selector<T> {
    #[must_use]
    pub fn new(project: impl Fn(&StoreState) -> T + 'static) -> Self {
        Self {
            project: Rc::new(project),
        }
    }

    /// Run the projection.
    pub fn select(&self, state: &StoreState) -> T {
        (self.project)(state)
    }

    /// Whether both selectors share one projection function.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.project), Rc::as_ptr(&other.project))
    }
}

impl<T: Clone + 'static> Selector<T> {
    /// Build a selector that recomputes only when its dependencies change.
    ///
    /// `deps` must be cheap: it runs on every call. `compute` receives the
    /// dependencies, not the state, so everything it reads is declared.
    #[must_use]
    pub fn memoized<D>(
        deps: impl Fn(&StoreState) -> D + 'static,
        compute: impl Fn(&D) -> T + 'static,
    ) -> Self
    where
        D: PartialEq + 'static,
    {
        let cache: RefCell<Option<(D, T)>> = RefCell::new(None);
        Self::new(move |state| {
            let current = deps(state);
            let hit = cache
                .borrow()
                .as_ref()
                .and_then(|(cached_deps, cached)| (*cached_deps == current).then(|| cached.clone()));
            if let Some(cached) = hit {
                return cached;
            }
            let value = compute(&current);
            *cache.borrow_mut() = Some((current, value.clone()));
            value
        })
    }
}
