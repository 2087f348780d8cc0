//! Atomic reactive cells
//!
//! A `Signal<T>` owns one value. Setting a value that differs from the
//! current one (under the signal's equality) bumps the version, marks every
//! dependent [`Computed`] stale and notifies direct observers synchronously,
//! in subscription order.
//!
//! # Reentrancy
//!
//! Observers may call `set` on the signal they observe. The new value is
//! stored immediately, but the notification is deferred: every reentrant set
//! made during one pass is coalesced into exactly one follow-up pass, which
//! sees the latest value.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use state_store::Signal;
//!
//! let rate = Signal::new(1.0_f64);
//! let seen = Rc::new(Cell::new(0));
//!
//! let sub = {
//!     let rate_handle = rate.clone();
//!     let seen = Rc::clone(&seen);
//!     rate.subscribe(move |r| {
//!         seen.set(seen.get() + 1);
//!         if *r > 2.0 {
//!             rate_handle.set(2.0); // clamp from inside the observer
//!         }
//!     })
//! };
//!
//! rate.set(4.0);
//! assert_eq!(rate.get(), 2.0);
//! assert_eq!(seen.get(), 2);
//! # drop(sub);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::computed::Computed;
use crate::source::{AsSource, Dependent, DependentList, Source};
use crate::subscription::{Detach, ObserverList, Subscription};

/// Equality used to decide whether a `set` is a change
pub type Equality<T> = fn(&T, &T) -> bool;

/// `PartialEq` equality, the default for every signal
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Float equality where `NaN` equals `NaN`
///
/// Media engines report unknown durations as `NaN`; with plain `PartialEq`
/// every repeated `NaN` would count as a change.
pub fn same_value(a: &f64, b: &f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// A mutable reactive cell
///
/// Cloning a `Signal` produces another handle to the same cell.
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T: 'static> {
    value: RefCell<T>,
    version: Cell<u64>,
    eq: Equality<T>,
    observers: ObserverList<T>,
    dependents: DependentList,
    notifying: Cell<bool>,
    pending: Cell<bool>,
}

/// Resets the notifying flag even if an observer panics
struct NotifyGuard<'a>(&'a Cell<bool>);

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: Clone + 'static> SignalInner<T> {
    fn notify(&self) {
        if self.notifying.get() {
            self.pending.set(true);
            return;
        }
        self.notifying.set(true);
        let _guard = NotifyGuard(&self.notifying);

        loop {
            let value = self.value.borrow().clone();
            for observer in self.observers.snapshot() {
                observer.call(&value);
            }
            if !self.pending.replace(false) {
                break;
            }
        }
    }
}

impl<T: PartialEq + Clone + 'static> Signal<T> {
    /// Create a signal using `PartialEq` to detect changes
    pub fn new(value: T) -> Self {
        Self::with_equality(value, equals::<T>)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a signal with a custom change test
    pub fn with_equality(value: T, eq: Equality<T>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                eq,
                observers: ObserverList::new(),
                dependents: DependentList::default(),
                notifying: Cell::new(false),
                pending: Cell::new(false),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value
    ///
    /// `f` must not call `set` on this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store a value, returning whether it was a change
    ///
    /// Equal values are ignored: no version bump, no invalidation, no
    /// notification.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if (self.inner.eq)(&current, &value) {
                false
            } else {
                *current = value;
                true
            }
        };

        if changed {
            self.inner.version.set(self.inner.version.get() + 1);
            self.inner.dependents.invalidate_all();
            self.inner.notify();
        }
        changed
    }

    /// Modify a copy of the value and store it
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// Observe changes
    ///
    /// The observer is not called with the current value, only with later
    /// changes.
    pub fn subscribe(&self, observer: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.inner.observers.push(Box::new(observer));
        let owner: Rc<dyn Detach> = self.inner.clone();
        Subscription::new(id, Rc::downgrade(&owner))
    }

    /// Number of changes since creation
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of direct observers
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Number of live computed values depending on this signal
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Derive a value from this signal alone
    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Computed<U> {
        let source = self.clone();
        Computed::new(&[self], move || source.with(|value| f(value)))
    }
}

impl<T: 'static> Detach for SignalInner<T> {
    fn detach(&self, id: u64) {
        self.observers.remove(id);
    }
}

impl<T: 'static> Source for SignalInner<T> {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn add_dependent(&self, dependent: Weak<dyn Dependent>) {
        self.dependents.push(dependent);
    }
}

impl<T: 'static> AsSource for Signal<T> {
    fn as_source(&self) -> Rc<dyn Source> {
        self.inner.clone()
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Signal");
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<borrowed>"),
        };
        debug
            .field("version", &self.inner.version.get())
            .field("observer_count", &self.inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(signal: &Signal<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = {
            let seen = Rc::clone(&seen);
            signal.subscribe(move |v: &T| seen.borrow_mut().push(v.clone()))
        };
        (seen, sub)
    }

    #[test]
    fn test_set_notifies_on_change() {
        let signal = Signal::new(1);
        let (seen, _sub) = recorder(&signal);

        assert!(signal.set(2));
        assert_eq!(signal.get(), 2);
        assert_eq!(signal.version(), 1);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_equal_value_is_not_a_change() {
        let signal = Signal::new(1);
        let (seen, _sub) = recorder(&signal);

        assert!(!signal.set(1));
        assert_eq!(signal.version(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_nan_equality() {
        let duration = Signal::with_equality(f64::NAN, same_value);
        assert!(!duration.set(f64::NAN));
        assert!(duration.set(60.0));
        assert!(!duration.set(60.0));
    }

    #[test]
    fn test_observers_run_in_subscription_order() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                signal.subscribe(move |_| order.borrow_mut().push(i))
            })
            .collect();

        signal.set(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn test_reentrant_sets_coalesce_into_one_pass() {
        let signal = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let handle = signal.clone();
            let seen = Rc::clone(&seen);
            signal.subscribe(move |v| {
                seen.borrow_mut().push(*v);
                if *v == 1 {
                    handle.set(2);
                    handle.set(3);
                }
            })
        };

        signal.set(1);
        assert_eq!(*seen.borrow(), vec![1, 3]);
        assert_eq!(signal.get(), 3);
    }

    #[test]
    fn test_unsubscribe_during_pass_skips_later_observer() {
        let signal = Signal::new(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let _first = {
            let slot = Rc::clone(&slot);
            signal.subscribe(move |_| {
                if let Some(sub) = slot.borrow().as_ref() {
                    sub.unsubscribe();
                }
            })
        };
        let (seen, second) = recorder(&signal);
        *slot.borrow_mut() = Some(second);

        signal.set(1);
        signal.set(2);
        assert!(seen.borrow().is_empty());
        assert_eq!(signal.observer_count(), 1);
    }

    #[test]
    fn test_update() {
        let signal = Signal::new(vec![1, 2]);
        assert!(signal.update(|v| v.push(3)));
        assert_eq!(signal.get(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropped_subscription_stops_notifications() {
        let signal = Signal::new(0);
        let (seen, sub) = recorder(&signal);

        signal.set(1);
        drop(sub);
        signal.set(2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(signal.observer_count(), 0);
    }
}
