//! Memoized derived values
//!
//! A `Computed<T>` caches the result of a pure derivation over a fixed list
//! of sources. Propagation is pull-on-read with push-triggered invalidation:
//!
//! - when a source changes, the computed (and everything derived from it)
//!   is marked dirty, but nothing is recomputed;
//! - the derivation runs on the next `get()`, and only if the source version
//!   vector recorded at the last run is out of date.
//!
//! Derived results are not compared for equality. Consumers that need
//! referential stability should memoize further themselves.
//!
//! # Example
//!
//! ```rust
//! use state_store::{Computed, Signal};
//!
//! let current_time = Signal::new(30.0_f64);
//! let duration = Signal::new(120.0_f64);
//!
//! let progress = {
//!     let (t, d) = (current_time.clone(), duration.clone());
//!     Computed::new(&[&current_time, &duration], move || {
//!         let d = d.get();
//!         if d > 0.0 { t.get() / d } else { 0.0 }
//!     })
//! };
//!
//! assert_eq!(progress.get(), 0.25);
//! assert_eq!(progress.get(), 0.25);
//! assert_eq!(progress.recompute_count(), 1);
//!
//! current_time.set(60.0);
//! assert_eq!(progress.get(), 0.5);
//! assert_eq!(progress.recompute_count(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::source::{AsSource, Dependent, DependentList, Source};

/// A lazily recomputed, memoized value derived from other cells
///
/// Cloning a `Computed` produces another handle to the same cache.
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T: 'static> {
    derive: Box<dyn Fn() -> T>,
    sources: Vec<Rc<dyn Source>>,
    cached: RefCell<Option<T>>,
    seen_versions: RefCell<Vec<u64>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    recomputes: Cell<u64>,
    dependents: DependentList,
}

impl<T: 'static> ComputedInner<T> {
    fn source_versions(&self) -> Vec<u64> {
        self.sources.iter().map(|source| source.version()).collect()
    }

    /// Bring the cache up to date
    fn refresh(&self) {
        if !self.dirty.get() {
            return;
        }
        let versions = self.source_versions();
        let stale = self.cached.borrow().is_none() || *self.seen_versions.borrow() != versions;

        if stale {
            let value = (self.derive)();
            *self.cached.borrow_mut() = Some(value);
            *self.seen_versions.borrow_mut() = versions;
            self.recomputes.set(self.recomputes.get() + 1);
        }
        self.dirty.set(false);
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed value over `sources`
    ///
    /// `derive` must read only the listed sources; reads of anything else are
    /// not tracked and will not invalidate the cache.
    pub fn new(sources: &[&dyn AsSource], derive: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new(ComputedInner {
            derive: Box::new(derive),
            sources: sources.iter().map(|source| source.as_source()).collect(),
            cached: RefCell::new(None),
            seen_versions: RefCell::new(Vec::new()),
            dirty: Cell::new(true),
            version: Cell::new(0),
            recomputes: Cell::new(0),
            dependents: DependentList::default(),
        });

        let weak = Rc::downgrade(&inner);
        let dependent: Weak<dyn Dependent> = weak;
        for source in &inner.sources {
            source.add_dependent(dependent.clone());
        }

        Self { inner }
    }

    /// Borrow the current value, recomputing first if stale
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.refresh();
        match self.inner.cached.borrow().as_ref() {
            Some(value) => f(value),
            None => f(&(self.inner.derive)()),
        }
    }

    /// Whether the next read will consult the sources
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// How many times the derivation has run
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.get()
    }

    /// Number of invalidations since creation
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Derive a further value from this one
    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Computed<U> {
        let source = self.clone();
        Computed::new(&[self], move || source.with(|value| f(value)))
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Current value, recomputing first if stale
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: 'static> Dependent for ComputedInner<T> {
    fn invalidate(&self) {
        self.dirty.set(true);
        self.version.set(self.version.get() + 1);
        // Always propagate: a dependent may be clean while this one was
        // already dirty if it skipped reading us on its last run.
        self.dependents.invalidate_all();
    }
}

impl<T: 'static> Source for ComputedInner<T> {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn add_dependent(&self, dependent: Weak<dyn Dependent>) {
        self.dependents.push(dependent);
    }
}

impl<T: 'static> AsSource for Computed<T> {
    fn as_source(&self) -> Rc<dyn Source> {
        self.inner.clone()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Computed");
        match self.inner.cached.try_borrow() {
            Ok(cached) => debug.field("cached", &*cached),
            Err(_) => debug.field("cached", &"<borrowed>"),
        };
        debug
            .field("dirty", &self.inner.dirty.get())
            .field("recomputes", &self.inner.recomputes.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;

    #[test]
    fn test_lazy_until_first_read() {
        let source = Signal::new(2);
        let doubled = source.map(|v| v * 2);

        assert!(doubled.is_dirty());
        assert_eq!(doubled.recompute_count(), 0);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.recompute_count(), 1);
    }

    #[test]
    fn test_memoized_between_reads() {
        let source = Signal::new(2);
        let doubled = source.map(|v| v * 2);

        for _ in 0..5 {
            assert_eq!(doubled.get(), 4);
        }
        assert_eq!(doubled.recompute_count(), 1);
    }

    #[test]
    fn test_invalidation_does_not_recompute_eagerly() {
        let source = Signal::new(2);
        let doubled = source.map(|v| v * 2);
        doubled.get();

        source.set(3);
        source.set(4);
        source.set(5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.recompute_count(), 1);

        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.recompute_count(), 2);
    }

    #[test]
    fn test_unrelated_change_does_not_invalidate() {
        let a = Signal::new(1);
        let b = Signal::new(100);
        let from_a = a.map(|v| v + 1);
        from_a.get();

        b.set(200);
        assert!(!from_a.is_dirty());
        assert_eq!(from_a.get(), 2);
        assert_eq!(from_a.recompute_count(), 1);
    }

    #[test]
    fn test_transitive_invalidation() {
        let source = Signal::new(1);
        let plus_one = source.map(|v| v + 1);
        let times_ten = plus_one.map(|v| v * 10);

        assert_eq!(times_ten.get(), 20);
        source.set(4);
        assert!(plus_one.is_dirty());
        assert!(times_ten.is_dirty());
        assert_eq!(times_ten.get(), 50);
        assert_eq!(plus_one.recompute_count(), 2);
        assert_eq!(times_ten.recompute_count(), 2);
    }

    #[test]
    fn test_multiple_sources() {
        let width = Signal::new(1280_u32);
        let height = Signal::new(720_u32);
        let label = {
            let (w, h) = (width.clone(), height.clone());
            Computed::new(&[&width, &height], move || format!("{}x{}", w.get(), h.get()))
        };

        assert_eq!(label.get(), "1280x720");
        height.set(1080);
        width.set(1920);
        assert_eq!(label.get(), "1920x1080");
        assert_eq!(label.recompute_count(), 2);
    }

    #[test]
    fn test_dropped_computed_is_pruned() {
        let source = Signal::new(1);
        let derived = source.map(|v| *v);
        assert_eq!(source.dependent_count(), 1);

        drop(derived);
        assert_eq!(source.dependent_count(), 0);
        source.set(2);
    }
}
