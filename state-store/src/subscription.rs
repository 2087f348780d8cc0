//! Observer registries and subscription handles
//!
//! An `ObserverList` owns the callbacks registered on a reactive cell (or on
//! any aggregate built from cells). Registering a callback hands back a
//! `Subscription` that only holds a weak reference to the list's owner, so a
//! handle that outlives its owner keeps nothing alive and releasing it
//! becomes a no-op.
//!
//! # Example
//!
//! ```rust
//! use state_store::Signal;
//!
//! let volume = Signal::new(50u8);
//! let sub = volume.subscribe(|v| println!("volume is now {v}"));
//!
//! volume.set(75);
//! sub.unsubscribe();
//! sub.unsubscribe(); // second call is a no-op
//! volume.set(80); // no longer observed
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Something that can drop an observer by id
///
/// Implemented by owners of an [`ObserverList`] so that a [`Subscription`]
/// can release its entry without knowing the owner's concrete type.
pub trait Detach {
    /// Remove the observer with the given id. Unknown ids are ignored.
    fn detach(&self, id: u64);
}

/// A registered callback together with the key it was registered under
pub struct Observer<A: ?Sized, K = ()> {
    id: u64,
    key: K,
    active: Cell<bool>,
    callback: RefCell<Box<dyn FnMut(&A)>>,
}

impl<A: ?Sized, K> Observer<A, K> {
    /// Registration id, unique within the owning list
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Key the observer was registered under
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Whether the observer is still registered
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Invoke the callback if the observer is still active
    ///
    /// Returns `false` when the observer was released (possibly earlier in the
    /// same notification pass) or is already running further up the stack.
    pub fn call(&self, arg: &A) -> bool {
        if !self.active.get() {
            return false;
        }
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => {
                callback(arg);
                true
            }
            Err(_) => false,
        }
    }
}

impl<A: ?Sized, K: fmt::Debug> fmt::Debug for Observer<A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("active", &self.active.get())
            .finish()
    }
}

/// Ordered registry of observers
///
/// Observers are kept in registration order. Notification passes iterate over
/// a snapshot of the list, so observers added during a pass are not called
/// until the next one, and observers removed during a pass are skipped.
pub struct ObserverList<A: ?Sized, K = ()> {
    entries: RefCell<Vec<Rc<Observer<A, K>>>>,
    next_id: Cell<u64>,
}

impl<A: ?Sized, K> ObserverList<A, K> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register a callback under `key`, returning its id
    pub fn insert(&self, key: K, callback: Box<dyn FnMut(&A)>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Rc::new(Observer {
            id,
            key,
            active: Cell::new(true),
            callback: RefCell::new(callback),
        }));
        id
    }

    /// Remove an observer, returning whether it was registered
    pub fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|o| o.id == id) {
            Some(index) => {
                let observer = entries.remove(index);
                observer.active.set(false);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the currently registered observers, in registration order
    pub fn snapshot(&self) -> Vec<Rc<Observer<A, K>>> {
        self.entries.borrow().clone()
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no observers are registered
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Release every observer
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.borrow_mut().drain(..).collect();
        for observer in drained {
            observer.active.set(false);
        }
    }
}

impl<A: ?Sized> ObserverList<A, ()> {
    /// Register a callback that has no key
    pub fn push(&self, callback: Box<dyn FnMut(&A)>) -> u64 {
        self.insert((), callback)
    }
}

impl<A: ?Sized, K> Default for ObserverList<A, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized, K> fmt::Debug for ObserverList<A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observer_count", &self.len())
            .finish()
    }
}

/// Handle for a registered observer
///
/// Releasing is idempotent: `unsubscribe()` may be called any number of
/// times, and dropping the handle releases it as well. Use
/// [`Subscription::forget`] to keep the observer registered for as long as
/// its owner lives.
#[must_use = "dropping a Subscription releases the observer immediately"]
pub struct Subscription {
    id: u64,
    owner: Option<Weak<dyn Detach>>,
    released: Cell<bool>,
}

impl Subscription {
    /// Create a handle for observer `id` owned by `owner`
    pub fn new(id: u64, owner: Weak<dyn Detach>) -> Self {
        Self {
            id,
            owner: Some(owner),
            released: Cell::new(false),
        }
    }

    /// A handle that is already released
    ///
    /// Returned when subscribing to something that can no longer deliver
    /// notifications, such as a destroyed store.
    pub fn inert() -> Self {
        Self {
            id: 0,
            owner: None,
            released: Cell::new(true),
        }
    }

    /// Registration id of the observer
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the handle has not been released and its owner is alive
    pub fn is_active(&self) -> bool {
        !self.released.get()
            && self
                .owner
                .as_ref()
                .map(|owner| owner.strong_count() > 0)
                .unwrap_or(false)
    }

    /// Release the observer. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if self.released.replace(true) {
            return;
        }
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.detach(self.id);
        }
    }

    /// Keep the observer registered for the lifetime of its owner
    pub fn forget(self) {
        self.released.set(true);
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
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owner {
        list: ObserverList<i32>,
    }

    impl Detach for Owner {
        fn detach(&self, id: u64) {
            self.list.remove(id);
        }
    }

    fn subscribe(owner: &Rc<Owner>, calls: &Rc<RefCell<Vec<i32>>>) -> Subscription {
        let calls = Rc::clone(calls);
        let id = owner.list.push(Box::new(move |v| calls.borrow_mut().push(*v)));
        let as_detach: Rc<dyn Detach> = owner.clone();
        Subscription::new(id, Rc::downgrade(&as_detach))
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let owner = Rc::new(Owner {
            list: ObserverList::new(),
        });
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sub = subscribe(&owner, &calls);

        assert_eq!(owner.list.len(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(owner.list.is_empty());
        assert!(!sub.is_active());
    }

    #[test]
    fn test_drop_releases_observer() {
        let owner = Rc::new(Owner {
            list: ObserverList::new(),
        });
        let calls = Rc::new(RefCell::new(Vec::new()));
        {
            let _sub = subscribe(&owner, &calls);
            assert_eq!(owner.list.len(), 1);
        }
        assert!(owner.list.is_empty());
    }

    #[test]
    fn test_forget_keeps_observer() {
        let owner = Rc::new(Owner {
            list: ObserverList::new(),
        });
        let calls = Rc::new(RefCell::new(Vec::new()));
        subscribe(&owner, &calls).forget();

        assert_eq!(owner.list.len(), 1);
        for observer in owner.list.snapshot() {
            observer.call(&7);
        }
        assert_eq!(*calls.borrow(), vec![7]);
    }

    #[test]
    fn test_handle_outliving_owner_is_noop() {
        let owner = Rc::new(Owner {
            list: ObserverList::new(),
        });
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sub = subscribe(&owner, &calls);

        drop(owner);
        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn test_removed_observer_is_skipped_in_snapshot() {
        let list: ObserverList<i32> = ObserverList::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let first = {
            let calls = Rc::clone(&calls);
            list.push(Box::new(move |v| calls.borrow_mut().push(*v)))
        };
        let snapshot = list.snapshot();

        list.remove(first);
        assert!(!snapshot[0].call(&1));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_inert_subscription() {
        let sub = Subscription::inert();
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
