//! Dependency tracking between reactive cells
//!
//! Every cell that can be depended upon is a [`Source`]: it exposes a
//! monotonically increasing version and accepts weakly-held
//! [`Dependent`]s which it invalidates whenever its value changes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A cell whose changes can be observed by derived values
pub trait Source {
    /// Version counter, bumped on every change that may alter the value
    fn version(&self) -> u64;

    /// Register a dependent to be invalidated on change
    ///
    /// Dependents are held weakly; dropping a derived value unregisters it.
    fn add_dependent(&self, dependent: Weak<dyn Dependent>);
}

/// Something that caches a value derived from one or more sources
pub trait Dependent {
    /// Mark the cached value as stale
    fn invalidate(&self);
}

/// Conversion into a shared, type-erased source
///
/// Implemented by [`Signal`](crate::Signal) and [`Computed`](crate::Computed)
/// so both can be listed as dependencies of a `Computed`.
pub trait AsSource {
    /// The underlying source node
    fn as_source(&self) -> Rc<dyn Source>;
}

/// Weak list of dependents, pruned as dependents are dropped
#[derive(Default)]
pub(crate) struct DependentList {
    entries: RefCell<Vec<Weak<dyn Dependent>>>,
}

impl DependentList {
    pub(crate) fn push(&self, dependent: Weak<dyn Dependent>) {
        self.entries.borrow_mut().push(dependent);
    }

    /// Invalidate every live dependent and forget the dead ones
    pub(crate) fn invalidate_all(&self) {
        let live: Vec<Rc<dyn Dependent>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for dependent in live {
            dependent.invalidate();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
